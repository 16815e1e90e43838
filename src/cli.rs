use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "reeldrop")]
#[command(author, version, about = "Telegram bot that replies to TikTok, Instagram and Facebook reel links with the video", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Run the bot in normal mode
    Run {
        /// Use webhook mode instead of long polling
        #[arg(long)]
        webhook: bool,
    },

    /// Probe a video link and print its metadata
    Info {
        /// TikTok, Instagram Reel or Facebook Reel link
        url: String,

        /// Print the metadata as JSON
        #[arg(long)]
        json: bool,
    },

    /// Download a video link into a folder
    Download {
        /// TikTok, Instagram Reel or Facebook Reel link
        url: String,

        /// Output folder (defaults to DOWNLOAD_FOLDER)
        #[arg(short, long)]
        output: Option<String>,

        /// best, high (≤1080p), medium (≤720p), worst, or an explicit yt-dlp format id
        #[arg(short, long, default_value = "best")]
        quality: String,

        /// Prefer the watermarked rendition
        #[arg(long)]
        watermark: bool,

        /// Output container: mp4, webm or avi
        #[arg(short, long, default_value = "mp4")]
        format: String,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// True for subcommands whose result goes to stdout (`info`, `download`)
    pub fn prints_to_stdout(&self) -> bool {
        matches!(self.command, Some(Commands::Info { .. }) | Some(Commands::Download { .. }))
    }
}
