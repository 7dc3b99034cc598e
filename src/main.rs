use clap::{Parser, Subcommand};
use lazy_static::lazy_static;
use log::{error, LevelFilter};
use reqwest::Client;

mod error;
mod youtube;

use youtube::youtube::{get_channel_videos, get_info, get_thumbnail, ThumbnailFormat};

lazy_static! {
    static ref CLIENT: Client = Client::new();
}

#[derive(Parser, Debug)]
#[clap(author, version, about = "Metadata extraction for YouTube pages", long_about = None)]
pub struct Args {
    #[clap(subcommand)]
    command: Command,

    /// Enable debug mode (prints debug info to stdout)
    #[clap(long)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Get video info
    Getinfo {
        /// Video URL or ID
        input: String,
    },

    /// Get list of channel videos
    Getchannelvideos {
        /// Channel URL, handle or ID
        input: String,
    },

    /// Get video thumbnail
    Getthumbnail {
        /// Video URL or ID
        input: String,

        /// Output filename
        filename: String,

        /// Thumbnail format
        #[clap(long, value_enum, default_value_t)]
        format: ThumbnailFormat,
    },
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let log_level = if args.debug {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    rich_logger::init(log_level).expect("Failed to initialize logger");

    if let Err(e) = run(args.command).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(command: Command) -> anyhow::Result<()> {
    match command {
        Command::Getinfo { input } => {
            let info = get_info(&input, Some(&CLIENT)).await?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        Command::Getchannelvideos { input } => {
            let videos = get_channel_videos(&input, Some(&CLIENT)).await?;
            println!("{}", videos.join("\n"));
        }
        Command::Getthumbnail {
            input,
            filename,
            format,
        } => {
            let image = get_thumbnail(&input, format, Some(&CLIENT)).await?;
            tokio::fs::write(&filename, &image).await?;
        }
    }

    Ok(())
}
