use clap::{Parser, ValueEnum};
use smart_scrape::export::ExportFormat;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "smart-scrape")]
#[command(about = "Scrapes text from paginated pages, following load-more buttons or page URLs")]
#[command(version)]
pub struct Args {
    /// Page to start from; use {page} where the page number belongs
    pub url: String,

    /// HTML tag whose text is collected
    #[arg(short, long, value_enum, default_value_t = TagArg::H1)]
    pub tag: TagArg,

    /// Path to a JSON scraper configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// WebDriver server URL (overrides config and WEBDRIVER_URL)
    #[arg(long)]
    pub webdriver: Option<String>,

    /// Show the browser window instead of running headless
    #[arg(long)]
    pub headed: bool,

    /// Replay a saved site (JSON) instead of driving a browser
    #[arg(long)]
    pub replay: Option<PathBuf>,

    /// Save the results in this format
    #[arg(short, long, value_enum)]
    pub export: Option<ExportArg>,

    /// Where to save the export (defaults to a name derived from the URL)
    #[arg(short, long, requires = "export")]
    pub output: Option<PathBuf>,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum TagArg {
    H1,
    H2,
    H3,
    P,
    Div,
    Span,
    Li,
    A,
}

impl TagArg {
    pub fn as_str(self) -> &'static str {
        match self {
            TagArg::H1 => "h1",
            TagArg::H2 => "h2",
            TagArg::H3 => "h3",
            TagArg::P => "p",
            TagArg::Div => "div",
            TagArg::Span => "span",
            TagArg::Li => "li",
            TagArg::A => "a",
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ExportArg {
    Csv,
    Tsv,
    Xlsx,
}

impl From<ExportArg> for ExportFormat {
    fn from(arg: ExportArg) -> Self {
        match arg {
            ExportArg::Csv => ExportFormat::Csv,
            ExportArg::Tsv => ExportFormat::Tsv,
            ExportArg::Xlsx => ExportFormat::Xlsx,
        }
    }
}
