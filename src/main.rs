use std::path::PathBuf;
use std::sync::Arc;

use actix_files as fs;
use actix_web::{App, HttpServer, Responder, web};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{error, info};

use advisor_studio::clock::{Clock, ImmediateClock, TokioClock};
use advisor_studio::config::{AppConfig, ConfigManager, DEFAULT_CONFIG_FILE};
use advisor_studio::error::{StudioError, StudioResult};
use advisor_studio::export;
use advisor_studio::handlers::{self, AppState};
use advisor_studio::logging;
use advisor_studio::models::{AdvisorId, Progress, WordBudget};
use advisor_studio::outreach;
use advisor_studio::projector;
use advisor_studio::research::ResearchPlan;
use advisor_studio::scripts::{MICHAEL_RODRIGUEZ, Roster, SARAH_CHEN};
use advisor_studio::studio::Studio;
use advisor_studio::terminal;
use advisor_studio::wizard::DateRange;

/// Marketing content studio for financial advisors
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Path to the JSON config file
    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Also log to stderr
    #[arg(long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum ExportFormat {
    Text,
    Html,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the advisor roster
    Roster,
    /// Show an advisor's script at a given reveal position
    Preview {
        advisor: String,
        /// Section the cursor is in; omit to show the finished script
        #[arg(long)]
        section: Option<usize>,
        /// Words revealed within that section
        #[arg(long, default_value_t = 0)]
        words: usize,
    },
    /// Run the wizard end to end and play the reveal in the terminal
    Play {
        /// Advisors to generate for (exactly two)
        #[arg(long, num_args = 2, default_values = [MICHAEL_RODRIGUEZ, SARAH_CHEN])]
        advisors: Vec<String>,
        #[arg(long, default_value = "ETF")]
        topic: String,
        /// Skip the research animations
        #[arg(long)]
        no_preroll: bool,
        /// Speed multiplier for the research animations
        #[arg(long)]
        speed: Option<f64>,
        /// Write the text export here once generation completes
        #[arg(long)]
        export_dir: Option<PathBuf>,
    },
    /// Write exports without playing the reveal
    Export {
        #[arg(long, num_args = 2, default_values = [MICHAEL_RODRIGUEZ, SARAH_CHEN])]
        advisors: Vec<String>,
        #[arg(long, value_enum, default_value_t = ExportFormat::Text)]
        format: ExportFormat,
        #[arg(long, default_value = "exports")]
        out: PathBuf,
        /// Generation date, defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Print the email and calendar links for an advisor
    Links { advisor: String },
    /// Serve the HTTP API
    Serve {
        #[arg(long)]
        bind: Option<String>,
    },
}

fn load_config(cli: &Cli) -> StudioResult<AppConfig> {
    let manager = ConfigManager::new(&cli.config);
    let mut config = manager.load_config()?;
    config.apply_env_overrides()?;
    if cli.verbose {
        config.logging.console = true;
    }
    Ok(config)
}

/// Walks the wizard up to the profile step for `advisors`.
fn prepare_wizard(studio: &Studio, advisors: &[String], topic: &str) -> StudioResult<Vec<AdvisorId>> {
    studio.submit_date_range(DateRange::default())?;
    studio.finish_research()?;
    studio.select_topic(topic)?;
    for advisor in advisors {
        studio.toggle_advisor(advisor)?;
    }
    let state = studio.proceed_to_profiles()?;
    Ok(state.selected)
}

fn print_roster(roster: &Roster) {
    for persona in roster.all() {
        let sections = persona.script.as_ref().map_or(0, |script| script.len());
        match &persona.profile {
            Some(profile) => println!(
                "{:<18} {:<20} {:<16} {} sections  ({})",
                persona.id,
                persona.name,
                profile.firm,
                sections,
                profile.licenses.join(", ")
            ),
            None => println!("{:<18} {:<20} {:<16} no content", persona.id, persona.name, "-"),
        }
    }
}

fn preview(studio: &Studio, advisor: &str, section: Option<usize>, words: usize) -> StudioResult<()> {
    let persona = studio.persona(advisor)?;
    let script = persona
        .script
        .as_ref()
        .ok_or_else(|| StudioError::NoScript(persona.name.clone()))?;
    let progress = match section {
        Some(index) => Progress {
            current_section: index.min(script.last_index()),
            words_revealed: WordBudget::Words(words),
            is_complete: false,
        },
        None => Progress::completed(script.last_index()),
    };
    let view = projector::project(script, &progress, studio.board().config().link_tokens);
    print!("{}", terminal::render_view(&persona.name, &view));
    Ok(())
}

async fn play(
    studio: Arc<Studio>,
    advisors: &[String],
    topic: &str,
    export_dir: Option<PathBuf>,
) -> StudioResult<()> {
    let with_research = studio.preroll().enabled;
    studio.submit_date_range(DateRange::default())?;
    if with_research {
        let printer = tokio::spawn(terminal::print_research(studio.subscribe_research()));
        studio.play_research(&ResearchPlan::landing_research()).await;
        let _ = printer.await;
    }

    studio.finish_research()?;
    studio.select_topic(topic)?;
    for advisor in advisors {
        studio.toggle_advisor(advisor)?;
    }
    let selected = studio.proceed_to_profiles()?.selected;

    let printer = with_research
        .then(|| tokio::spawn(terminal::print_research(studio.subscribe_research())));
    let started = studio.generate_with_preroll().await?;
    if let Some(printer) = printer {
        let _ = printer.await;
    }
    if started.is_none() {
        return Ok(());
    }

    terminal::follow_generation(studio.clone(), &selected).await?;

    if let Some(dir) = export_dir {
        let (file_name, body) = studio.export_text(Utc::now().date_naive())?;
        let path = export::write_export(&dir, &file_name, &body)?;
        println!("Exported to {}", path.display());
    }
    Ok(())
}

async fn export_now(
    config: &AppConfig,
    advisors: &[String],
    format: ExportFormat,
    out: PathBuf,
    date: Option<NaiveDate>,
) -> StudioResult<()> {
    // Reveal instantly, exports are gated on completion
    let studio = Studio::new(Roster::get_instance(), Arc::new(ImmediateClock), config);
    let selected = prepare_wizard(&studio, advisors, "ETF")?;
    studio.generate()?;
    for advisor in &selected {
        if let Some(mut events) = studio.board().subscribe(advisor) {
            while !events.borrow_and_update().progress.is_complete {
                if events.changed().await.is_err() {
                    break;
                }
            }
        }
    }

    let date = date.unwrap_or_else(|| Utc::now().date_naive());
    match format {
        ExportFormat::Text => {
            let (file_name, body) = studio.export_text(date)?;
            let path = export::write_export(&out, &file_name, &body)?;
            println!("{}", path.display());
        }
        ExportFormat::Html => {
            for advisor in &selected {
                let (file_name, body) = studio.export_html(advisor, date)?;
                let path = export::write_export(&out, &file_name, &body)?;
                println!("{}", path.display());
            }
        }
    }
    Ok(())
}

// Index handler to serve the frontend
async fn index(data: web::Data<PathBuf>) -> impl Responder {
    fs::NamedFile::open_async(data.join("index.html")).await
}

async fn serve(config: &AppConfig, bind: Option<String>) -> StudioResult<()> {
    let bind = bind.unwrap_or_else(|| config.server.bind.clone());
    let clock: Arc<dyn Clock> = Arc::new(TokioClock);
    let studio = Arc::new(Studio::new(Roster::get_instance(), clock, config));
    let app_state = web::Data::new(AppState { studio });
    let static_dir = config.server.static_dir.clone();

    info!("Starting server at http://{}", bind);
    println!("Starting server at http://{}", bind);

    HttpServer::new(move || {
        let app = App::new()
            .app_data(app_state.clone())
            .service(web::scope("/api").configure(handlers::configure));

        match &static_dir {
            Some(dir) => app
                .app_data(web::Data::new(dir.clone()))
                .service(fs::Files::new("/assets", dir.join("assets")))
                .default_service(web::get().to(index)),
            None => app,
        }
    })
    .bind(&bind)?
    .run()
    .await?;
    Ok(())
}

async fn run(cli: Cli) -> StudioResult<()> {
    let mut config = load_config(&cli)?;
    let _guard = logging::init_tracing(&config.logging)?;
    info!(command = ?cli.command, "Starting advisor studio");

    match cli.command {
        Commands::Roster => {
            print_roster(&Roster::get_instance());
            Ok(())
        }
        Commands::Preview {
            advisor,
            section,
            words,
        } => {
            let studio = Studio::new(Roster::get_instance(), Arc::new(ImmediateClock), &config);
            preview(&studio, &advisor, section, words)
        }
        Commands::Play {
            advisors,
            topic,
            no_preroll,
            speed,
            export_dir,
        } => {
            if no_preroll {
                config.preroll.enabled = false;
            }
            if let Some(speed) = speed {
                config.preroll.speed = speed;
            }
            let studio = Arc::new(Studio::new(
                Roster::get_instance(),
                Arc::new(TokioClock),
                &config,
            ));
            play(studio, &advisors, &topic, export_dir).await
        }
        Commands::Export {
            advisors,
            format,
            out,
            date,
        } => export_now(&config, &advisors, format, out, date).await,
        Commands::Links { advisor } => {
            let roster = Roster::get_instance();
            let persona = roster
                .find(&advisor)
                .ok_or_else(|| StudioError::UnknownAdvisor(advisor.clone()))?;
            let links = outreach::links_for(persona, Utc::now());
            println!("Email:    {}", links.mailto);
            println!("Calendar: {}", links.calendar);
            Ok(())
        }
        Commands::Serve { bind } => serve(&config, bind).await,
    }
}

#[actix_web::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
