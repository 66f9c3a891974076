use crate::error::TacauthzError;

/// One word of a command pattern. `prefix` words end in `*` in config and
/// match any line word starting with `text`; a bare `*` matches any word.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Word {
    text: String,
    prefix: bool,
}

impl Word {
    fn matches(&self, word: &str) -> bool {
        if self.prefix {
            word.starts_with(&self.text)
        } else {
            word == self.text
        }
    }
}

/// Ranking key for the specificity matcher. Field order defines `Ord`:
/// literal characters first, then exact (non-prefix) words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Specificity {
    pub literal_chars: usize,
    pub exact_words: usize,
}

/// Compiled command pattern, matched word by word against
/// `command arg0 arg1 ...`. The line may carry more words than the pattern.
#[derive(Debug, Clone)]
pub struct CommandPattern {
    source: String,
    words: Vec<Word>,
}

impl CommandPattern {
    pub fn parse(source: &str) -> Result<Self, TacauthzError> {
        let words: Vec<Word> = source
            .split_whitespace()
            .map(|w| match w.strip_suffix('*') {
                Some(text) => Word {
                    text: text.to_owned(),
                    prefix: true,
                },
                None => Word {
                    text: w.to_owned(),
                    prefix: false,
                },
            })
            .collect();

        match words.first() {
            None => Err(TacauthzError::PolicyValidation(
                "command pattern must not be empty".to_owned(),
            )),
            Some(first) if first.text.is_empty() => Err(TacauthzError::PolicyValidation(format!(
                "command pattern '{source}': command name must not be a bare wildcard"
            ))),
            Some(_) => Ok(Self {
                source: source.trim().to_owned(),
                words,
            }),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, command: &str, args: &[String]) -> bool {
        let mut line = std::iter::once(command).chain(args.iter().map(String::as_str));
        self.words
            .iter()
            .all(|w| line.next().is_some_and(|word| w.matches(word)))
    }

    pub fn specificity(&self) -> Specificity {
        Specificity {
            literal_chars: self.words.iter().map(|w| w.text.chars().count()).sum(),
            exact_words: self.words.iter().filter(|w| !w.prefix).count(),
        }
    }
}

impl PartialEq for CommandPattern {
    fn eq(&self, other: &Self) -> bool {
        self.words == other.words
    }
}

impl Eq for CommandPattern {}
