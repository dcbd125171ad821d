use std::path::PathBuf;

use clap::Subcommand;

use morningbrief::DocumentKind;

#[derive(Subcommand)]
pub enum Commands {
    /// Append texts to the store and save it
    Add {
        #[arg(required = true)]
        texts: Vec<String>,

        #[arg(short, long)]
        kind: Option<DocumentKind>,

        #[arg(short, long)]
        summary_id: Option<String>,
    },

    Retrieve {
        query: String,

        /// Number of results, at least 1
        #[arg(long, default_value = "6", value_parser = clap::value_parser!(u64).range(1..))]
        num: u64,

        #[arg(short, long)]
        min_score: Option<f32>,

        /// Only return documents of these types (summary, feedback)
        #[arg(short, long)]
        kind: Option<Vec<DocumentKind>>,
    },

    /// Generate a brief from a JSON array of articles and archive it
    Brief {
        #[arg(short, long)]
        articles: PathBuf,

        /// Comma or newline separated listener interests
        #[arg(short, long, env = "INTERESTS", default_value = "")]
        interests: String,

        #[arg(short, long)]
        target_words: Option<usize>,
    },

    /// Record listener feedback on a brief
    Feedback {
        summary_id: String,

        /// 1 to 5; omit to skip rating
        #[arg(short, long)]
        rating: Option<u8>,

        #[arg(long, default_value = "")]
        likes: String,

        #[arg(long, default_value = "")]
        dislikes: String,
    },

    Stats,
}
