use clap::{Parser, Subcommand};
use quizlist::batch::BatchProcessor;
use quizlist::client::ListingClient;
use quizlist::enrich::EnrichmentClient;
use quizlist::persistence::{FileStorage, StateStorage};
use quizlist::serializer;
use quizlist::session::{self, AuthSession};
use quizlist::AiConfig;

/// YouTube playlist metadata editor and quiz-document exporter
#[derive(Parser)]
#[command(
    name = "quizlist",
    about = "YouTube playlist metadata editor and quiz-document exporter",
    long_about = None
)]
struct Cli {
    /// Show detailed debug information
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the OAuth authorization URL to open in a browser
    AuthUrl {
        /// OAuth client id (falls back to QUIZLIST_CLIENT_ID)
        #[arg(long)]
        client_id: Option<String>,

        /// Redirect URI registered for the client
        #[arg(long, default_value = "http://localhost:8080/")]
        redirect_uri: String,

        /// Opaque state echoed back in the redirect
        #[arg(long, default_value = "quizlist")]
        state: String,
    },

    /// Store the token from the post-authorization redirect fragment
    Login {
        /// The URL fragment after the redirect, e.g. "#access_token=...&expires_in=3599"
        fragment: String,
    },

    /// List your playlists
    Playlists,

    /// Fetch a playlist's tracks and write a quiz document
    Fetch {
        /// Playlist id as shown by `quizlist playlists`
        playlist_id: String,

        /// Output file
        #[arg(long, short)]
        out: String,
    },

    /// Summarize a quiz document without modifying it
    Inspect {
        /// Document file
        file: String,
    },

    /// Batch-enrich every song in a quiz document
    Enrich {
        /// Document file
        file: String,

        /// Output file (defaults to rewriting the input)
        #[arg(long, short)]
        out: Option<String>,
    },

    /// Show or update the enrichment endpoint configuration
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the stored configuration (the API key is redacted)
    Show,
    /// Store the endpoint configuration
    Set {
        #[arg(long)]
        api_key: String,
        #[arg(long, default_value = "https://api.openai.com/v1")]
        base_url: String,
        #[arg(long, default_value = "gpt-4o-mini")]
        model: String,
    },
}

fn storage() -> FileStorage {
    match FileStorage::new() {
        Ok(storage) => storage,
        Err(e) => {
            eprintln!("❌ Cannot open the state directory: {e}");
            std::process::exit(1);
        }
    }
}

async fn live_session() -> AuthSession<FileStorage> {
    let mut session = AuthSession::restore(storage()).await;
    if !session.is_valid().await {
        eprintln!("❌ No valid token. Run `quizlist auth-url`, authorize in the browser,");
        eprintln!("   then paste the redirect fragment into `quizlist login`.");
        std::process::exit(1);
    }
    session
}

fn listing_client() -> ListingClient {
    ListingClient::new(Box::new(http_client::native::NativeClient::new()))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Cli::parse();

    let mut builder = env_logger::Builder::from_default_env();
    if args.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();

    match args.command {
        Commands::AuthUrl {
            client_id,
            redirect_uri,
            state,
        } => {
            let client_id = client_id
                .or_else(|| std::env::var("QUIZLIST_CLIENT_ID").ok())
                .unwrap_or_else(|| {
                    eprintln!("❌ No client id. Pass --client-id or set QUIZLIST_CLIENT_ID.");
                    std::process::exit(1);
                });
            println!(
                "{}",
                session::authorization_url(&client_id, &redirect_uri, &state)
            );
        }

        Commands::Login { fragment } => {
            let params = session::parse_fragment(&fragment);
            let mut auth = AuthSession::restore(storage()).await;
            auth.consume_authorization_fragment(&params).await?;
            println!("✅ Token stored.");
        }

        Commands::Playlists => {
            let mut auth = live_session().await;
            let playlists = listing_client().fetch_playlists(&mut auth).await?;
            if playlists.is_empty() {
                println!("No playlists found.");
            }
            for playlist in playlists {
                println!("{}  {}", playlist.id, playlist.title);
            }
        }

        Commands::Fetch { playlist_id, out } => {
            let mut auth = live_session().await;
            let client = listing_client();
            let summary = client
                .fetch_playlists(&mut auth)
                .await?
                .into_iter()
                .find(|p| p.id == playlist_id)
                .unwrap_or_else(|| {
                    eprintln!("❌ No playlist with id {playlist_id} in your collection.");
                    std::process::exit(1);
                });
            let playlist = client.fetch_playlist(&mut auth, &summary).await?;
            std::fs::write(&out, serializer::export_json(&playlist)?)?;
            println!(
                "✅ Wrote {} tracks from \"{}\" to {out}",
                playlist.tracks.len(),
                playlist.title
            );
        }

        Commands::Inspect { file } => {
            let report = serializer::import_json(&std::fs::read_to_string(&file)?)?;
            println!(
                "\"{}\": {} songs",
                report.playlist.title,
                report.playlist.tracks.len()
            );
            for track in &report.playlist.tracks {
                let mandatory = track.fields.iter().filter(|f| f.mandatory).count();
                let bonus = track.fields.len() - mandatory;
                println!(
                    "  {}  {} ({} point fields, {} bonus)",
                    track.id,
                    track.display_title(),
                    mandatory,
                    bonus
                );
            }
            for skip in &report.skipped {
                println!("  ⚠️ skipped song {}: {}", skip.position, skip.reason);
            }
        }

        Commands::Enrich { file, out } => {
            let config = storage().load_ai_config().await?.unwrap_or_else(|| {
                eprintln!("❌ No enrichment configuration. Run `quizlist config set` first.");
                std::process::exit(1);
            });
            if !config.is_configured() {
                eprintln!("❌ Incomplete enrichment configuration.");
                std::process::exit(1);
            }

            let report = serializer::import_json(&std::fs::read_to_string(&file)?)?;
            let mut playlist = report.playlist;
            for skip in &report.skipped {
                println!("⚠️ skipped song {}: {}", skip.position, skip.reason);
            }

            let enricher = EnrichmentClient::new(
                Box::new(http_client::native::NativeClient::new()),
                config,
            );
            let processor = BatchProcessor::new(enricher);

            let mut progress = processor.subscribe_progress();
            let reporter = tokio::spawn(async move {
                while progress.changed().await.is_ok() {
                    let p = *progress.borrow_and_update();
                    println!("🎵 Enriching track {}/{}", p.current, p.total);
                }
            });

            let summary = processor.run(&mut playlist.tracks).await?;
            reporter.abort();

            for title in &summary.success_titles {
                println!("✅ {title}");
            }
            for failure in &summary.failures {
                println!("❌ {}: {}", failure.title, failure.reason);
            }

            let out = out.unwrap_or(file);
            std::fs::write(&out, serializer::export_json(&playlist)?)?;
            println!(
                "Done: {} enriched, {} failed. Wrote {out}",
                summary.success_titles.len(),
                summary.failures.len()
            );
        }

        Commands::Config { action } => match action {
            ConfigCommands::Show => match storage().load_ai_config().await? {
                Some(config) => {
                    println!("base_url: {}", config.base_url);
                    println!("model:    {}", config.model);
                    let key_preview: String = config.api_key.chars().take(6).collect();
                    println!(
                        "api_key:  {}",
                        if key_preview.is_empty() {
                            "(unset)".to_string()
                        } else {
                            format!("{key_preview}…")
                        }
                    );
                }
                None => println!("No configuration stored."),
            },
            ConfigCommands::Set {
                api_key,
                base_url,
                model,
            } => {
                let mut store = storage();
                store
                    .save_ai_config(&AiConfig::new(api_key, base_url, model))
                    .await?;
                println!("✅ Configuration stored.");
            }
        },
    }

    Ok(())
}
