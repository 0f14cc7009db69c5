use thiserror::Error;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliOptions {
    pub base_url: Option<String>,
    pub show_log: bool,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("unknown argument: {0}")]
    UnknownArgument(String),
    #[error("missing value for argument: {0}")]
    MissingValue(String),
    #[error("help requested")]
    HelpRequested,
}

impl CliOptions {
    pub fn parse<I>(args: I) -> Result<Self, CliError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut options = Self::default();

        let mut iter = args.into_iter();
        while let Some(arg) = iter.next() {
            match arg.as_str() {
                "--help" | "-h" => return Err(CliError::HelpRequested),
                "--base-url" => {
                    let value = iter.next().ok_or(CliError::MissingValue(arg.clone()))?;
                    options.base_url = Some(value);
                }
                "--show-log" => options.show_log = true,
                unknown => match unknown.strip_prefix("--base-url=") {
                    Some(value) => options.base_url = Some(value.to_string()),
                    None => return Err(CliError::UnknownArgument(unknown.to_string())),
                },
            }
        }

        Ok(options)
    }
}

/// One line typed at the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplCommand {
    Query(String),
    NewConversation,
    ToggleLog,
    Retry,
    Health,
    Quit,
    Blank,
}

impl ReplCommand {
    pub fn parse(line: &str) -> Self {
        match line.trim() {
            "" => Self::Blank,
            "/new" => Self::NewConversation,
            "/log" => Self::ToggleLog,
            "/retry" => Self::Retry,
            "/health" => Self::Health,
            "/quit" | "/exit" => Self::Quit,
            _ => Self::Query(line.to_string()),
        }
    }
}
