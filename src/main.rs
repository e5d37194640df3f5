//! Quill CLI binary entry point.

use quill::cli::{
    ArticlesCommands, AuthCommands, Cli, Commands, TaxonomyCommands,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse_args();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = cli.config()?;
    let services = quill::cli::build_services(&config)?;

    match &cli.command {
        Commands::Auth(auth_args) => match &auth_args.command {
            AuthCommands::Login(args) => quill::cli::auth::handle_login(&services, args).await,
            AuthCommands::Register(args) => quill::cli::auth::handle_register(&services, args).await,
            AuthCommands::Status => quill::cli::auth::handle_status(&services).await,
            AuthCommands::Logout => quill::cli::auth::handle_logout(&services).await,
        },
        Commands::Articles(articles) => match &articles.command {
            ArticlesCommands::List(args) => quill::cli::browse::handle_list_articles(&services, args).await,
            ArticlesCommands::Show(args) => quill::cli::browse::handle_show_article(&services, args).await,
        },
        Commands::Star(args) => quill::cli::browse::handle_star(&services, args).await,
        Commands::Tags(tags) => match tags.command {
            TaxonomyCommands::List => quill::cli::browse::handle_list_tags(&services).await,
        },
        Commands::Categories(categories) => match categories.command {
            TaxonomyCommands::List => quill::cli::browse::handle_list_categories(&services).await,
        },
    }
}
