use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "memopad", bin_name = "memopad", version)]
#[command(about = "Personal notes kept in a hosted table", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Verbose output (debug logging on stderr)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List your notes
    #[command(alias = "ls")]
    List,

    /// Add a note (text from arguments or stdin)
    #[command(alias = "n")]
    Add {
        /// Note text (words are joined with spaces)
        text: Vec<String>,
    },

    /// Edit a note (opens $EDITOR when no text is given)
    #[command(alias = "e")]
    Edit {
        /// Note position (1, 2, …) or id
        note: String,

        /// Replacement text
        text: Vec<String>,
    },

    /// Delete a note
    #[command(alias = "rm")]
    Delete {
        /// Note position (1, 2, …) or id
        note: String,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Log in with email and password
    Login {
        #[arg(short, long)]
        email: String,

        /// Prompted for (not echoed) when omitted
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Create an account
    Signup {
        #[arg(short, long)]
        email: String,

        /// Prompted for (not echoed) when omitted
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Log out and forget the stored session
    Logout,

    /// Show who is logged in
    Status,

    /// Get or set configuration values
    Config {
        /// Configuration key (url, anon-key, table)
        key: Option<String>,

        /// Value to set
        value: Option<String>,
    },
}
