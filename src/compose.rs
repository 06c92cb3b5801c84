use crate::error::ComposeError;
use crate::shortener::LinkShortener;

/// Hard limit on post length, in chars.
pub const POST_LIMIT: usize = 140;
/// Room left for text once a 23-char short link and its separator are placed.
pub const TEXT_BUDGET: usize = 116;

const ELLIPSIS: char = '…';

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedPost {
    pub text: String,
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn join(text: &str, url: &str) -> String {
    format!("{} {}", text, url)
}

/// Build the post for one entry: `Feed/Entry url`. When too long, the link
/// is shortened first; if it still does not fit, the text is cut to
/// `TEXT_BUDGET` chars ending in an ellipsis.
pub async fn compose(
    feed_title: Option<&str>,
    entry_title: &str,
    url: &str,
    shortener: &dyn LinkShortener,
) -> Result<ComposedPost, ComposeError> {
    let mut text = match feed_title.filter(|t| !t.is_empty()) {
        Some(feed) => format!("{}/{}", feed, entry_title),
        None => entry_title.to_string(),
    };
    let mut candidate = join(&text, url);

    if char_len(&candidate) > POST_LIMIT {
        let short = shortener.shorten(url).await?;
        candidate = join(&text, &short);

        if char_len(&candidate) > POST_LIMIT {
            text = truncate(&text);
            candidate = join(&text, &short);
        }
    }

    let length = char_len(&candidate);
    if length > POST_LIMIT {
        return Err(ComposeError::TooLong {
            length,
            limit: POST_LIMIT,
        });
    }
    Ok(ComposedPost { text: candidate })
}

/// Cut `text` to `TEXT_BUDGET` chars, the last being an ellipsis. Text
/// already within budget is returned unchanged.
fn truncate(text: &str) -> String {
    let len = char_len(text);
    if len <= TEXT_BUDGET {
        return text.to_string();
    }
    let over = len - TEXT_BUDGET;
    let mut cut: String = text.chars().take(len - over - 1).collect();
    cut.push(ELLIPSIS);
    cut
}
