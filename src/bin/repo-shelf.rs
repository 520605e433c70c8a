#[macro_use]
extern crate log;

use std::env;
use std::io::Write;
use std::str::FromStr;

use chrono::Local;
use env_logger::Builder;
use failure::{Error, ResultExt};
use log::LevelFilter;
use repo_shelf::{Config, Driver, ProviderKind, Repo};
use structopt::StructOpt;

#[tokio::main]
async fn main() {
    let args = Args::from_args();

    if args.example_config {
        generate_example();
        return;
    }

    if let Err(e) = run(&args).await {
        eprintln!("Error: {}", e);

        for cause in e.iter_causes() {
            eprintln!("\tCaused By: {}", cause);
        }

        std::process::exit(1);
    }
}

fn generate_example() {
    let example = Config::example();

    println!("{}", example.as_toml());
}

async fn run(args: &Args) -> Result<(), Error> {
    initialize_logging(args)?;
    let cfg = args.config()?;

    if log_enabled!(log::Level::Debug) {
        for line in format!("{:#?}", cfg).lines() {
            debug!("{}", line);
        }
    }

    let mut driver = Driver::with_config(&cfg)?;

    for custom in &args.providers {
        driver.register_provider(custom.kind, &custom.domain);
    }

    match args.cmd.as_ref().unwrap_or(&Command::List) {
        Command::Add { url } => {
            let added = driver.import(url).await?;
            println!("Added {} repositories", added.len());
            for repo in &added {
                print_repo(repo);
            }
        }
        Command::List => {
            for repo in driver.list().await? {
                print_repo(&repo);
            }
        }
        Command::Tag { url, topics } => {
            let repo = driver.set_topics(url, topics.clone()).await?;
            print_repo(&repo);
        }
        Command::Remove { url } => {
            if driver.remove(url).await? {
                println!("Removed {}", url);
            } else {
                println!("{} isn't on the shelf", url);
            }
        }
        Command::Refresh { url } => {
            let repo = driver.refresh(url).await?;
            print_repo(&repo);
        }
    }

    Ok(())
}

fn print_repo(repo: &Repo) {
    let mut line = String::from(repo.display_name());

    if let Some(stars) = repo.stars {
        line.push_str(&format!(" ({} stars)", stars));
    }
    if let Some(lang) = repo.lang.as_deref().filter(|l| !l.is_empty()) {
        line.push_str(&format!(" [{}]", lang));
    }
    if let Some(topics) = repo.topics.as_ref().filter(|t| !t.is_empty()) {
        line.push_str(&format!(" #{}", topics.join(" #")));
    }

    println!("{}", line);
}

#[derive(Debug, Clone, PartialEq, StructOpt)]
#[structopt(about = "Curate a shelf of your favourite repositories")]
struct Args {
    #[structopt(
        short = "c",
        long = "config",
        default_value = "~/.repo-shelf.toml",
        help = "The configuration file to use."
    )]
    config_file: String,
    #[structopt(
        short = "v",
        long = "verbose",
        parse(from_occurrences),
        help = "Verbose output (repeat for more verbosity)"
    )]
    verbosity: u64,
    #[structopt(
        long = "example-config",
        help = "Generate an example config and immediately exit."
    )]
    example_config: bool,
    #[structopt(
        short = "p",
        long = "provider",
        number_of_values = 1,
        help = "Register a self-hosted provider (e.g. gitlab:git.example.com)"
    )]
    providers: Vec<ProviderArg>,
    #[structopt(subcommand)]
    cmd: Option<Command>,
}

impl Args {
    pub fn config(&self) -> Result<Config, Error> {
        let config_file = shellexpand::full(&self.config_file)
            .context("Unable to expand wildcards")?;

        Config::from_file(&*config_file)
            .context("Couldn't load the config")
            .map_err(Into::into)
    }
}

#[derive(Debug, Clone, PartialEq, StructOpt)]
enum Command {
    /// Add a repository, or everything a user has starred when given their
    /// profile URL.
    #[structopt(name = "add")]
    Add { url: String },
    /// Show every repository on the shelf (the default).
    #[structopt(name = "list")]
    List,
    /// Replace a stored repository's topics.
    #[structopt(name = "tag")]
    Tag { url: String, topics: Vec<String> },
    /// Take a repository off the shelf.
    #[structopt(name = "remove")]
    Remove { url: String },
    /// Fetch the latest metadata for a stored repository.
    #[structopt(name = "refresh")]
    Refresh { url: String },
}

/// A `kind:domain` pair from the command line.
#[derive(Debug, Clone, PartialEq)]
struct ProviderArg {
    kind: ProviderKind,
    domain: String,
}

impl FromStr for ProviderArg {
    type Err = Error;

    fn from_str(s: &str) -> Result<ProviderArg, Error> {
        let mut split = s.splitn(2, ':');
        let kind = split.next().unwrap_or_default().parse::<ProviderKind>()?;
        let domain = match split.next() {
            Some(domain) if !domain.is_empty() => domain.to_string(),
            _ => {
                return Err(failure::err_msg(format!(
                    "Expected \"kind:domain\", found \"{}\"",
                    s
                )))
            }
        };

        Ok(ProviderArg { kind, domain })
    }
}

fn initialize_logging(args: &Args) -> Result<(), Error> {
    let mut builder = Builder::new();

    let level = match args.verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    builder.filter(Some("repo_shelf"), level);

    if let Ok(filter) = env::var("RUST_LOG") {
        builder.parse_filters(&filter);
    }

    builder.format(|out, record| match record.line() {
        Some(line) => writeln!(
            out,
            "{} [{:5}] ({}#{}): {}",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            record.level(),
            record.target(),
            line,
            record.args()
        ),
        None => writeln!(
            out,
            "{} [{:5}] ({}): {}",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            record.level(),
            record.target(),
            record.args()
        ),
    });

    builder.try_init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_provider_args() {
        let got: ProviderArg = "gitea:git.example.com".parse().unwrap();

        assert_eq!(got.kind, ProviderKind::Gitea);
        assert_eq!(got.domain, "git.example.com");
        assert!("gitea".parse::<ProviderArg>().is_err());
        assert!("svn:example.com".parse::<ProviderArg>().is_err());
    }

    #[test]
    fn parse_a_command_line() {
        let args = Args::from_iter_safe(&[
            "repo-shelf",
            "-vv",
            "--provider",
            "gitlab:git.example.com",
            "tag",
            "https://github.com/torvalds/linux",
            "kernel",
            "c",
        ])
        .unwrap();

        assert_eq!(args.verbosity, 2);
        assert_eq!(args.providers.len(), 1);
        assert_eq!(
            args.cmd,
            Some(Command::Tag {
                url: String::from("https://github.com/torvalds/linux"),
                topics: vec![String::from("kernel"), String::from("c")],
            })
        );
    }
}
