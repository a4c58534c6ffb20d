use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "clipshot")]
#[command(about = "Audio, photo, and video capture with a local artifact store", long_about = None)]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<CliCommand>,
}

#[derive(Subcommand, Debug)]
pub enum CliCommand {
    /// Print version information
    Version,
    /// List stored artifacts, newest first
    List(ListCliArgs),
}

#[derive(ClapArgs, Debug)]
pub struct ListCliArgs {
    /// Restrict the listing to one medium (audio, photo, video)
    #[arg(short, long)]
    pub kind: Option<String>,
    /// Maximum number of results to show per medium
    #[arg(short, long, default_value = "20")]
    pub limit: usize,
}
