//! Intent classification for transcribed utterances.
//!
//! Utterances are matched against a fixed, ordered rule table before anything
//! reaches the conversational backend. The first rule that matches wins.
//!
//! | # | Trigger (normalized text) | Intent |
//! |---|---------------------------|--------|
//! | 1 | `hello`/`hi`/`hey`, ≤ 3 words | `Greeting` |
//! | 2 | `exit`/`quit`/`goodbye`/`bye` | `Farewell` |
//! | 3 | `time` + `what` | `CurrentTime` |
//! | 4 | `date` + `what` | `CurrentDate` |
//! | 5 | `open browser` | `OpenBrowser` |
//! | 6 | `search`, or `google` + `for` | `Search` |
//! | 7 | `open website`/`go to` + a target word | `OpenWebsite` |
//! | 8 | `open` without `browser`/`website` | `LaunchApp` |
//! | 9 | `system`/`computer` | `SystemInfo` |
//! | - | anything else | `Converse` |
//!
//! Keyword tests are plain substring tests, so `hi` also fires inside words
//! such as `this`; the word-count limit on greetings keeps that in check.

/// What the user asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Greeting,
    Farewell,
    CurrentTime,
    CurrentDate,
    OpenBrowser,
    /// Web search. `None` when the utterance held only trigger words.
    Search { query: Option<String> },
    /// Navigate to the word following `website` or `to`, as spoken.
    OpenWebsite { target: String },
    /// Launch an application. `None` when no name followed `open`.
    LaunchApp { name: Option<String> },
    SystemInfo,
    /// No built-in rule matched; hand the utterance to the backend.
    Converse,
}

/// A single entry of the rule table.
struct IntentRule {
    name: &'static str,
    matches: fn(&str) -> Option<Intent>,
}

const GREETING_WORDS: &[&str] = &["hello", "hi", "hey"];
const FAREWELL_WORDS: &[&str] = &["exit", "quit", "goodbye", "bye"];
const SEARCH_STRIP: &[&str] = &["search", "google", "for"];
const MAX_GREETING_WORDS: usize = 3;

const RULES: &[IntentRule] = &[
    IntentRule {
        name: "greeting",
        matches: greeting,
    },
    IntentRule {
        name: "farewell",
        matches: farewell,
    },
    IntentRule {
        name: "time",
        matches: time,
    },
    IntentRule {
        name: "date",
        matches: date,
    },
    IntentRule {
        name: "open_browser",
        matches: open_browser,
    },
    IntentRule {
        name: "search",
        matches: search,
    },
    IntentRule {
        name: "open_website",
        matches: open_website,
    },
    IntentRule {
        name: "launch_app",
        matches: launch_app,
    },
    IntentRule {
        name: "system_info",
        matches: system_info,
    },
];

/// Lowercase and trim an utterance.
pub fn normalize(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Classify a normalized utterance.
///
/// Returns `None` for blank input.
pub fn classify(normalized: &str) -> Option<Intent> {
    if normalized.trim().is_empty() {
        return None;
    }
    let intent = RULES
        .iter()
        .find_map(|rule| {
            (rule.matches)(normalized).inspect(|_| {
                tracing::debug!(rule = rule.name, "intent rule matched");
            })
        })
        .unwrap_or(Intent::Converse);
    Some(intent)
}

fn contains_any(text: &str, words: &[&str]) -> bool {
    words.iter().any(|w| text.contains(w))
}

fn greeting(text: &str) -> Option<Intent> {
    (contains_any(text, GREETING_WORDS) && text.split_whitespace().count() <= MAX_GREETING_WORDS)
        .then_some(Intent::Greeting)
}

fn farewell(text: &str) -> Option<Intent> {
    contains_any(text, FAREWELL_WORDS).then_some(Intent::Farewell)
}

fn time(text: &str) -> Option<Intent> {
    (text.contains("time") && text.contains("what")).then_some(Intent::CurrentTime)
}

fn date(text: &str) -> Option<Intent> {
    (text.contains("date") && text.contains("what")).then_some(Intent::CurrentDate)
}

fn open_browser(text: &str) -> Option<Intent> {
    text.contains("open browser").then_some(Intent::OpenBrowser)
}

fn search(text: &str) -> Option<Intent> {
    if !(text.contains("search") || (text.contains("google") && text.contains("for"))) {
        return None;
    }
    let query = SEARCH_STRIP
        .iter()
        .fold(text.to_owned(), |acc, word| acc.replace(word, ""));
    let query = query.trim();
    Some(Intent::Search {
        query: (!query.is_empty()).then(|| query.to_owned()),
    })
}

fn open_website(text: &str) -> Option<Intent> {
    if !(text.contains("open website") || text.contains("go to")) {
        return None;
    }
    let words: Vec<&str> = text.split_whitespace().collect();
    words
        .windows(2)
        .find(|pair| pair[0] == "website" || pair[0] == "to")
        .map(|pair| Intent::OpenWebsite {
            target: pair[1].to_owned(),
        })
}

fn launch_app(text: &str) -> Option<Intent> {
    if !text.contains("open") || text.contains("browser") || text.contains("website") {
        return None;
    }
    let name = text.replace("open", "");
    let name = name.trim();
    Some(Intent::LaunchApp {
        name: (!name.is_empty()).then(|| name.to_owned()),
    })
}

fn system_info(text: &str) -> Option<Intent> {
    (text.contains("system") || text.contains("computer")).then_some(Intent::SystemInfo)
}
