//! CLI entry point for Quill.

pub mod auth;
pub mod browse;

use std::sync::Arc;

use clap::{Parser, Subcommand};

use crate::auth::Navigator;
use crate::client::{AuthenticatedClient, HttpTransport};
use crate::config::ClientConfig;
use crate::services::Services;
use crate::types::ArticleSort;

/// Quill blog CLI
#[derive(Parser, Debug)]
#[command(name = "quill", version, about = "Quill blog client")]
pub struct Cli {
    /// API base URL (overrides QUILL_API_BASE_URL)
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Session management
    Auth(AuthArgs),
    /// Browse articles
    Articles(ArticlesArgs),
    /// Star or unstar an article
    Star(StarArgs),
    /// List tags
    Tags(TaxonomyArgs),
    /// List categories
    Categories(TaxonomyArgs),
}

/// Arguments for the `auth` subcommand group.
#[derive(Parser, Debug)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommands,
}

#[derive(Subcommand, Debug)]
pub enum AuthCommands {
    /// Log in with email and password
    Login(LoginArgs),
    /// Create an account and log in
    Register(RegisterArgs),
    /// Show the logged-in user
    Status,
    /// Log out and forget the stored token
    Logout,
}

#[derive(Parser, Debug)]
pub struct LoginArgs {
    #[arg(long)]
    pub email: String,
    #[arg(long)]
    pub password: String,
}

#[derive(Parser, Debug)]
pub struct RegisterArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub email: String,
    #[arg(long)]
    pub password: String,
    /// Defaults to --password
    #[arg(long)]
    pub password_confirm: Option<String>,
}

#[derive(Parser, Debug)]
pub struct ArticlesArgs {
    #[command(subcommand)]
    pub command: ArticlesCommands,
}

#[derive(Subcommand, Debug)]
pub enum ArticlesCommands {
    /// List one page of articles
    List(ListArticlesArgs),
    /// Show a single article
    Show(ShowArticleArgs),
}

#[derive(Parser, Debug)]
pub struct ListArticlesArgs {
    #[arg(long, default_value_t = 1)]
    pub page: u32,
    #[arg(long)]
    pub search: Option<String>,
    /// newest, oldest or stars
    #[arg(long)]
    pub sort: Option<ArticleSort>,
}

#[derive(Parser, Debug)]
pub struct ShowArticleArgs {
    pub id: String,
}

#[derive(Parser, Debug)]
pub struct StarArgs {
    /// Article id
    pub id: String,
}

#[derive(Parser, Debug)]
pub struct TaxonomyArgs {
    #[command(subcommand)]
    pub command: TaxonomyCommands,
}

#[derive(Subcommand, Debug)]
pub enum TaxonomyCommands {
    List,
}

impl Cli {
    /// Parse CLI arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Resolve the client configuration from the environment and flags.
    pub fn config(&self) -> crate::error::Result<ClientConfig> {
        let config = ClientConfig::from_env()?;
        Ok(match &self.base_url {
            Some(url) => config.with_base_url(url.clone()),
            None => config,
        })
    }
}

/// A terminal has no login screen to redirect to; tell the user instead.
#[derive(Debug, Default)]
pub struct TerminalNavigator;

impl Navigator for TerminalNavigator {
    fn current_route(&self) -> String {
        String::new()
    }

    fn redirect(&self, _route: &str) {
        eprintln!("Session expired. Run `quill auth login` to sign in again.");
    }
}

/// Services over HTTP, with the token persisted in the session file.
pub fn build_services(config: &ClientConfig) -> crate::error::Result<Services<HttpTransport>> {
    let client = AuthenticatedClient::from_config(config)?.with_navigator(Arc::new(TerminalNavigator));
    Ok(Services::new(Arc::new(client)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn parse_auth_login() {
        let cli = Cli::try_parse_from([
            "quill", "auth", "login", "--email", "ada@example.com", "--password", "hunter22",
        ])
        .unwrap();
        match cli.command {
            Commands::Auth(auth) => match auth.command {
                AuthCommands::Login(args) => {
                    assert_eq!(args.email, "ada@example.com");
                    assert_eq!(args.password, "hunter22");
                }
                other => panic!("expected Login, got {other:?}"),
            },
            other => panic!("expected Auth, got {other:?}"),
        }
    }

    #[test]
    fn parse_auth_status_and_logout() {
        let cli = Cli::try_parse_from(["quill", "auth", "status"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Auth(AuthArgs {
                command: AuthCommands::Status
            })
        ));
        let cli = Cli::try_parse_from(["quill", "auth", "logout"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Auth(AuthArgs {
                command: AuthCommands::Logout
            })
        ));
    }

    #[test]
    fn parse_articles_list_with_filters() {
        let cli = Cli::try_parse_from([
            "quill", "articles", "list", "--page", "3", "--search", "tokio", "--sort", "stars",
        ])
        .unwrap();
        match cli.command {
            Commands::Articles(ArticlesArgs {
                command: ArticlesCommands::List(args),
            }) => {
                assert_eq!(args.page, 3);
                assert_eq!(args.search.as_deref(), Some("tokio"));
                assert_eq!(args.sort, Some(ArticleSort::Stars));
            }
            other => panic!("expected articles list, got {other:?}"),
        }
    }

    #[test]
    fn parse_articles_list_defaults_to_first_page() {
        let cli = Cli::try_parse_from(["quill", "articles", "list"]).unwrap();
        match cli.command {
            Commands::Articles(ArticlesArgs {
                command: ArticlesCommands::List(args),
            }) => {
                assert_eq!(args.page, 1);
                assert!(args.sort.is_none());
            }
            other => panic!("expected articles list, got {other:?}"),
        }
    }

    #[test]
    fn parse_rejects_unknown_sort() {
        assert!(Cli::try_parse_from(["quill", "articles", "list", "--sort", "popular"]).is_err());
    }

    #[test]
    fn parse_global_base_url() {
        let cli = Cli::try_parse_from(["quill", "star", "a1", "--base-url", "http://blog.test"]).unwrap();
        assert_eq!(cli.base_url.as_deref(), Some("http://blog.test"));
        assert!(matches!(cli.command, Commands::Star(StarArgs { ref id }) if id == "a1"));
    }

    #[test]
    fn parse_missing_subcommand_is_error() {
        assert!(Cli::try_parse_from(["quill"]).is_err());
    }

    #[test]
    fn parse_login_missing_password_is_error() {
        assert!(Cli::try_parse_from(["quill", "auth", "login", "--email", "a@b.c"]).is_err());
    }
}
