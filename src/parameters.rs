//! Parameters shared by readers and writers.

/// Names of the parameters, as reported by
/// [`FormatInfo::is_parameter_supported`](crate::formats::FormatInfo::is_parameter_supported).
pub mod names {
    pub const REPLACE_MATCH_TOKENS: &str = "replaceMatchTokens";
    pub const MATCH_TOKEN: &str = "matchToken";
    pub const MAX_TOKENS_TO_READ: &str = "maxTokensToRead";
    pub const MAX_COMMENT_LENGTH: &str = "maxCommentLength";
    pub const RELAXED_PHYLIP: &str = "relaxedPhylip";
    pub const LINE_LENGTH: &str = "lineLength";
    pub const MAXIMUM_NAME_LENGTH: &str = "maximumNameLength";
    pub const CREATE_UNKNOWN_COMMAND_EVENTS: &str = "createUnknownCommandEvents";
    pub const IGNORE_COMMENTS: &str = "ignoreComments";
}

pub const DEFAULT_MATCH_TOKEN: &str = ".";
pub const DEFAULT_MAX_TOKENS_TO_READ: usize = 2048;
pub const DEFAULT_MAX_COMMENT_LENGTH: usize = 1024 * 1024;
pub const DEFAULT_LINE_LENGTH: usize = 80;
/// Name length of strict PHYLIP.
pub const PHYLIP_NAME_LENGTH: usize = 10;

/// Typed parameter set passed to every reader and writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadWriteParameters {
    /// Replace match tokens by the token of the first sequence at the same column.
    pub replace_match_tokens: bool,
    pub match_token: String,
    /// Maximal number of tokens per SEQUENCE_TOKENS event.
    pub max_tokens_to_read: usize,
    /// Maximal length of a COMMENT event before it is split.
    pub max_comment_length: usize,
    pub relaxed_phylip: bool,
    pub line_length: usize,
    pub maximum_name_length: Option<usize>,
    pub create_unknown_command_events: bool,
    pub ignore_comments: bool,
}

impl Default for ReadWriteParameters {
    fn default() -> Self {
        Self {
            replace_match_tokens: false,
            match_token: DEFAULT_MATCH_TOKEN.to_string(),
            max_tokens_to_read: DEFAULT_MAX_TOKENS_TO_READ,
            max_comment_length: DEFAULT_MAX_COMMENT_LENGTH,
            relaxed_phylip: false,
            line_length: DEFAULT_LINE_LENGTH,
            maximum_name_length: None,
            create_unknown_command_events: true,
            ignore_comments: false,
        }
    }
}

impl ReadWriteParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_replace_match_tokens(mut self, replace: bool) -> Self {
        self.replace_match_tokens = replace;
        self
    }

    pub fn with_match_token(mut self, token: impl Into<String>) -> Self {
        self.match_token = token.into();
        self
    }

    /// Values below 1 are raised to 1.
    pub fn with_max_tokens_to_read(mut self, max: usize) -> Self {
        self.max_tokens_to_read = max.max(1);
        self
    }

    /// Values below 1 are raised to 1.
    pub fn with_max_comment_length(mut self, max: usize) -> Self {
        self.max_comment_length = max.max(1);
        self
    }

    pub fn with_relaxed_phylip(mut self, relaxed: bool) -> Self {
        self.relaxed_phylip = relaxed;
        self
    }

    /// Values below 1 are raised to 1.
    pub fn with_line_length(mut self, length: usize) -> Self {
        self.line_length = length.max(1);
        self
    }

    pub fn with_maximum_name_length(mut self, length: Option<usize>) -> Self {
        self.maximum_name_length = length;
        self
    }

    pub fn with_create_unknown_command_events(mut self, create: bool) -> Self {
        self.create_unknown_command_events = create;
        self
    }

    pub fn with_ignore_comments(mut self, ignore: bool) -> Self {
        self.ignore_comments = ignore;
        self
    }

    /// Name length limit for PHYLIP output: the explicit value, otherwise
    /// [`PHYLIP_NAME_LENGTH`] unless relaxed names are enabled.
    pub fn phylip_name_length(&self) -> Option<usize> {
        match self.maximum_name_length {
            Some(length) => Some(length),
            None if self.relaxed_phylip => None,
            None => Some(PHYLIP_NAME_LENGTH),
        }
    }
}
