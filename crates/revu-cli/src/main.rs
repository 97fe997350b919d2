//! revu CLI - terminal client for the provider adapter layer.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use revu_core::{
    Config, MergeStrategy, PrStateFilter, Provider, ProviderKind, PullRequest, ReviewEvent,
};

#[derive(Parser)]
#[command(name = "revu")]
#[command(author, version, about = "revu - code review from the terminal", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Provider to talk to (github, gitlab, bitbucket, azure, gitea);
    /// defaults to the first configured one
    #[arg(short, long, global = true)]
    provider: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Configure providers
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// List pull requests
    Prs {
        /// Filter by state: open, closed or all
        #[arg(short, long, default_value = "open")]
        state: String,
    },

    /// Show one pull request with its files and review threads
    Pr {
        /// Pull request number
        number: u64,
    },

    /// List open pull requests authored by you
    Mine,

    /// List open pull requests awaiting your review
    ReviewRequests,

    /// List open pull requests you authored or were asked to review
    Involved,

    /// Approve a pull request
    Approve {
        /// Pull request number
        number: u64,
        /// Optional review body
        #[arg(short, long)]
        message: Option<String>,
    },

    /// Comment on a pull request
    Comment {
        /// Pull request number
        number: u64,
        /// Comment body
        #[arg(short, long)]
        message: String,
    },

    /// Merge a pull request
    Merge {
        /// Pull request number
        number: u64,
        /// Merge strategy: merge, squash or rebase
        #[arg(long, default_value = "merge")]
        strategy: String,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Configure the GitHub provider
    Github {
        /// Repository owner
        #[arg(long)]
        owner: String,
        /// Repository name
        #[arg(long)]
        repo: String,
        /// REST base URL for GitHub Enterprise (ends in /api/v3)
        #[arg(long)]
        url: Option<String>,
    },

    /// Configure the GitLab provider
    Gitlab {
        /// GitLab instance URL
        #[arg(long, default_value = "https://gitlab.com")]
        url: String,
        /// Namespace the project lives under
        #[arg(long)]
        owner: String,
        /// Project name
        #[arg(long)]
        repo: String,
    },

    /// Configure the Bitbucket Cloud provider
    Bitbucket {
        /// Workspace the repository lives in
        #[arg(long)]
        workspace: String,
        /// Repository slug
        #[arg(long)]
        repo: String,
    },

    /// Configure the Azure DevOps provider
    Azure {
        /// Organization name
        #[arg(long)]
        organization: String,
        /// Project name
        #[arg(long)]
        project: String,
        /// Repository name
        #[arg(long)]
        repo: String,
    },

    /// Configure the Gitea provider
    Gitea {
        /// Gitea instance URL
        #[arg(long)]
        url: String,
        /// Repository owner
        #[arg(long)]
        owner: String,
        /// Repository name
        #[arg(long)]
        repo: String,
    },

    /// Show current configuration
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let Some(command) = cli.command else {
        println!("revu - code review from the terminal");
        println!("Run with --help for usage information");
        return Ok(());
    };

    // Config commands need no provider or token
    let command = match command {
        Commands::Config { command } => return run_config(command),
        other => other,
    };

    let config = Config::load()?;
    let kind = select_provider(&config, cli.provider.as_deref())?;
    let provider = build_provider(&config, kind)?;

    match command {
        Commands::Config { .. } => unreachable!("handled above"),
        Commands::Prs { state } => {
            let state = parse_state(&state)?;
            print_prs(&provider.list_prs(state).await?);
        }
        Commands::Pr { number } => {
            let pr = provider.get_pr(number).await?;
            print_pr_details(&pr);

            let files = provider.get_pr_files(number).await?;
            println!("\nFiles ({}):", files.len());
            for file in &files {
                println!("  {} {} (+{} -{})", file.status, file.path, file.additions, file.deletions);
            }

            if provider.capabilities().review_threads {
                let threads = provider.get_review_threads(number).await?;
                println!("\nThreads ({}):", threads.len());
                for thread in &threads {
                    let state = if thread.is_resolved { "resolved" } else { "open" };
                    println!("  [{}] {} ({} comments)", state, thread.id, thread.comments.len());
                }
            }
        }
        Commands::Mine => print_prs(&provider.get_my_prs().await?),
        Commands::ReviewRequests => print_prs(&provider.get_review_requests().await?),
        Commands::Involved => print_prs(&provider.get_involved_prs().await?),
        Commands::Approve { number, message } => {
            provider
                .submit_review(number, message.as_deref().unwrap_or(""), ReviewEvent::Approve)
                .await?;
            println!("Approved #{}", number);
        }
        Commands::Comment { number, message } => {
            let comment = provider.add_comment(number, &message).await?;
            println!("Commented on #{} (comment {})", number, comment.id);
        }
        Commands::Merge { number, strategy } => {
            let strategy = parse_strategy(&strategy)?;
            if !provider.capabilities().merge_strategies.contains(&strategy) {
                anyhow::bail!(
                    "{} does not offer the '{}' merge strategy",
                    kind,
                    strategy.as_str()
                );
            }
            provider.merge_pr(number, strategy).await?;
            println!("Merged #{} ({})", number, strategy.as_str());
        }
    }

    Ok(())
}

fn run_config(command: ConfigCommands) -> anyhow::Result<()> {
    let mut config = Config::load()?;

    match command {
        ConfigCommands::Github { owner, repo, url } => {
            config.set("github.owner", &owner)?;
            config.set("github.repo", &repo)?;
            if let Some(url) = url {
                config.set("github.url", &url)?;
            }
        }
        ConfigCommands::Gitlab { url, owner, repo } => {
            config.set("gitlab.url", &url)?;
            config.set("gitlab.owner", &owner)?;
            config.set("gitlab.repo", &repo)?;
        }
        ConfigCommands::Bitbucket { workspace, repo } => {
            config.set("bitbucket.workspace", &workspace)?;
            config.set("bitbucket.repo", &repo)?;
        }
        ConfigCommands::Azure {
            organization,
            project,
            repo,
        } => {
            config.set("azure.organization", &organization)?;
            config.set("azure.project", &project)?;
            config.set("azure.repo", &repo)?;
        }
        ConfigCommands::Gitea { url, owner, repo } => {
            config.set("gitea.url", &url)?;
            config.set("gitea.owner", &owner)?;
            config.set("gitea.repo", &repo)?;
        }
        ConfigCommands::Show => {
            let providers = config.configured_providers();
            if providers.is_empty() {
                println!("No providers configured");
            }
            for kind in providers {
                println!(
                    "{} (token from {})",
                    kind,
                    revu_core::config::token_env_var(kind)
                );
            }
            return Ok(());
        }
    }

    config.save()?;
    println!("Configuration saved to {}", Config::config_path()?.display());
    Ok(())
}

/// Build the adapter for a configured provider.
fn build_provider(config: &Config, kind: ProviderKind) -> anyhow::Result<Box<dyn Provider>> {
    let provider_config = config.provider_config(kind)?;
    let provider: Box<dyn Provider> = match kind {
        ProviderKind::GitHub => Box::new(revu_github::GitHubProvider::new(&provider_config)),
        ProviderKind::GitLab => Box::new(revu_gitlab::GitLabProvider::new(&provider_config)),
        ProviderKind::Bitbucket => {
            Box::new(revu_bitbucket::BitbucketProvider::new(&provider_config))
        }
        ProviderKind::AzureDevOps => Box::new(revu_azure::AzureProvider::new(&provider_config)),
        ProviderKind::Gitea => Box::new(revu_gitea::GiteaProvider::new(&provider_config)),
    };
    Ok(provider)
}

fn select_provider(config: &Config, requested: Option<&str>) -> anyhow::Result<ProviderKind> {
    if let Some(name) = requested {
        return parse_kind(name);
    }
    config
        .configured_providers()
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("no provider configured; run 'revu config' first"))
}

fn parse_kind(name: &str) -> anyhow::Result<ProviderKind> {
    match name {
        "github" => Ok(ProviderKind::GitHub),
        "gitlab" => Ok(ProviderKind::GitLab),
        "bitbucket" => Ok(ProviderKind::Bitbucket),
        "azure" => Ok(ProviderKind::AzureDevOps),
        "gitea" => Ok(ProviderKind::Gitea),
        other => anyhow::bail!("unknown provider '{}'", other),
    }
}

fn parse_state(state: &str) -> anyhow::Result<PrStateFilter> {
    match state {
        "open" => Ok(PrStateFilter::Open),
        "closed" => Ok(PrStateFilter::Closed),
        "all" => Ok(PrStateFilter::All),
        other => anyhow::bail!("unknown state '{}'; expected open, closed or all", other),
    }
}

fn parse_strategy(strategy: &str) -> anyhow::Result<MergeStrategy> {
    match strategy {
        "merge" => Ok(MergeStrategy::Merge),
        "squash" => Ok(MergeStrategy::Squash),
        "rebase" => Ok(MergeStrategy::Rebase),
        other => anyhow::bail!(
            "unknown strategy '{}'; expected merge, squash or rebase",
            other
        ),
    }
}

fn print_prs(prs: &[PullRequest]) {
    if prs.is_empty() {
        println!("No pull requests");
        return;
    }
    for pr in prs {
        let author = pr
            .author
            .as_ref()
            .map(|u| u.login.as_str())
            .unwrap_or("unknown");
        let draft = if pr.draft { " [draft]" } else { "" };
        println!("#{:<5} {:?}{} {} ({})", pr.number, pr.state, draft, pr.title, author);
    }
}

fn print_pr_details(pr: &PullRequest) {
    println!("#{} {}", pr.number, pr.title);
    println!("State: {:?}  Draft: {}  Merged: {}", pr.state, pr.draft, pr.merged);
    println!("Branch: {} -> {}", pr.head_ref, pr.base_ref);
    if let Some(author) = &pr.author {
        println!("Author: {}", author.login);
    }
    if !pr.labels.is_empty() {
        println!("Labels: {}", pr.labels.join(", "));
    }
    println!("URL: {}", pr.url);
    if let Some(body) = &pr.body {
        if !body.is_empty() {
            println!("\n{}", body);
        }
    }
}
