//! Test-mention command.
//!
//! Posts an acknowledgment mentioning the most recent respondent with a
//! valid numeric recipient id, so operators can check that pings land.

use crate::error::Result;
use crate::models::Sheet;
use crate::services::{Announcer, ChatClient, RowFetcher};
use crate::utils::is_numeric_id;

/// Recipient id of the last row carrying a numeric one.
pub fn latest_recipient<'a>(sheet: &'a Sheet, field: &str) -> Option<&'a str> {
    sheet
        .rows
        .iter()
        .rev()
        .filter_map(|row| row.get(field))
        .find(|id| is_numeric_id(id))
}

/// Fetch the sheet and post the test mention to `channel_id`.
///
/// Returns the mentioned id, or `None` when the sheet had no valid one (the
/// "not found" notice is posted instead).
pub async fn run_test_mention(
    fetcher: &dyn RowFetcher,
    chat: &dyn ChatClient,
    announcer: &Announcer,
    channel_id: u64,
) -> Result<Option<String>> {
    let channel = chat.resolve_channel(channel_id).await?;
    let sheet = fetcher.fetch().await?;
    let recipient = latest_recipient(&sheet, announcer.recipient_field()).map(str::to_string);

    match &recipient {
        Some(id) => log::info!("Test mention for user {}", id),
        None => log::warn!("No numeric recipient id found in {} rows", sheet.rows.len()),
    }

    let message = announcer.test_mention_message(recipient.as_deref());
    announcer.send(&channel, &message).await?;
    Ok(recipient)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet(lines: &[&[&str]]) -> Sheet {
        Sheet::from_values(
            lines
                .iter()
                .map(|l| l.iter().map(|s| s.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn test_latest_recipient_skips_invalid_tail() {
        let s = sheet(&[
            &["Nome", "ID do Discord"],
            &["Ana", "111"],
            &["Bia", "222"],
            &["Caio", "not-an-id"],
            &["Duda"],
        ]);
        assert_eq!(latest_recipient(&s, "ID do Discord"), Some("222"));
    }

    #[test]
    fn test_latest_recipient_rejects_padding() {
        let s = sheet(&[&["ID do Discord"], &["111"], &[" 222 "]]);
        assert_eq!(latest_recipient(&s, "ID do Discord"), Some("111"));
    }

    #[test]
    fn test_latest_recipient_none() {
        let s = sheet(&[&["Nome", "ID do Discord"], &["Ana", ""]]);
        assert_eq!(latest_recipient(&s, "ID do Discord"), None);
        assert_eq!(latest_recipient(&Sheet::default(), "ID do Discord"), None);
    }
}
