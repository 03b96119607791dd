use anyhow::Context;
use clap::{Parser, ValueEnum};
use std::io::Read;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "kubesql")]
#[command(about = "Query Kubernetes resources across contexts and namespaces with SQL-like syntax")]
#[command(
    after_help = "Example:\n  kubesql \"SELECT kube-system, testing FROM minikube WHERE pod.status.phase = 'Running'\"\n\n\
                  SELECT lists namespaces, FROM lists kubeconfig contexts and WHERE combines\n\
                  <kind>.<field>.<path> = 'value' field selectors with AND/OR.\n\
                  Reserved words such as default must be double quoted: SELECT \"default\" ..."
)]
pub struct Cli {
    /// Query to run
    pub query: Option<String>,

    /// Read the query from a file ('-' for stdin)
    #[arg(short, long, value_name = "PATH", conflicts_with = "query")]
    pub file: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub output: OutputFormat,

    /// Path to the kubeconfig file (defaults to $KUBECONFIG or ~/.kube/config)
    #[arg(long, value_name = "PATH")]
    pub kubeconfig: Option<PathBuf>,

    /// Keep re-running the query in an interactive view
    #[arg(short, long)]
    pub watch: bool,

    /// Refresh interval in seconds for --watch
    #[arg(long, default_value = "5", value_parser = clap::value_parser!(u64).range(1..))]
    pub interval: u64,

    /// Maximum number of concurrent API calls
    #[arg(long, default_value = "8", value_parser = clap::value_parser!(u64).range(1..))]
    pub concurrency: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(ValueEnum, Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Yaml,
}

impl Cli {
    /// The query text, from the positional argument or from --file.
    pub fn query_text(&self) -> anyhow::Result<String> {
        match (&self.query, &self.file) {
            (Some(q), None) => Ok(q.clone()),
            (None, Some(path)) if path.as_os_str() == "-" => {
                let mut buf = String::new();
                std::io::stdin().read_to_string(&mut buf)?;
                Ok(buf)
            }
            (None, Some(path)) => std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read query file {}", path.display())),
            (Some(_), Some(_)) => anyhow::bail!("Pass either a query or --file, not both"),
            (None, None) => anyhow::bail!("No query given; pass it as an argument or with --file"),
        }
    }
}
