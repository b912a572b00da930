use clap::{Parser as ClapParser, Subcommand};
use colophon::build::Generator;
use colophon::config::Config;
use colophon::parser::MarkdownProcessor;
use colophon::render::Renderer;
use colophon::theme::Theme;
use console::style;
use std::path::PathBuf;
use std::time::Instant;

#[derive(ClapParser)]
#[command(author, version, about = "colophon - markdown posts in, a finished site out")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Subcommand, Clone)]
enum Commands {
    /// Generate the site into the configured output directory.
    Build {
        /// Path to the configuration file.
        #[arg(short, long, default_value = "colophon.toml")]
        config: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let start = Instant::now();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { config } => build(&config, cli.verbose, start)?,
    }
    Ok(())
}

fn build(config_path: &PathBuf, verbose: bool, start: Instant) -> anyhow::Result<()> {
    let config = Config::load(config_path)?;

    println!("{} Loading theme...", style("[1/4]").dim());
    let theme = Theme::load(&config.theme_dir())?;
    if verbose {
        println!("  using theme '{}' v{}", theme.name(), theme.version());
    }

    println!("{} Reading posts...", style("[2/4]").dim());
    let processor = MarkdownProcessor::new(
        config.md_dir(),
        &config.site.base_path,
        &config.syntax_theme(),
    );
    let posts = processor.load_posts();
    if verbose {
        println!("  {} posts found", posts.len());
    }

    println!("{} Preparing templates...", style("[3/4]").dim());
    let renderer = Renderer::new(&theme, &config)?;

    println!("{} Writing site...", style("[4/4]").dim());
    Generator::new(&config, &theme, &renderer, &posts).generate()?;

    println!(
        "{} {} posts built in {:.2}s.",
        style("success").cyan(),
        posts.len(),
        start.elapsed().as_secs_f32()
    );
    Ok(())
}
