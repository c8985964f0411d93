use anyhow::Result;
use chrono::Utc;
use rusqlite::params;
use tracing::info;
use uuid::Uuid;

use crate::Database;

/// Default house rules written to an empty board on first startup.
/// Content uses the inline markup vocabulary and bullet markers that
/// `hearth-markup` renders.
const DEFAULT_RULES: [(&str, &str); 7] = [
    (
        "Noise & quiet hours",
        "<b>Quiet hours: 10 pm to 6 am</b> → complete silence.\n\n\
         • No shouting or loud noise at any time.\n\
         • No group visits or loud laughter late at night.\n\n\
         <i>Exceptions for anyone with exams, work, or who needs to rest.</i>",
    ),
    (
        "Guests",
        "Guests are welcome, with conditions:\n\n\
         • They leave before quiet hours start.\n\
         • No repeated daily visits.\n\
         • <u>Whoever invited the guest</u> answers for any disturbance they cause.",
    ),
    (
        "Kitchen",
        "• Pots and utensils are stored under the sink.\n\
         • Shared spices stay on the counter for everyone (if the owner agrees).\n\
         • <mark>Clean everything right after use.</mark>\n\
         • Dirty dishes left out may be moved to the balcony by anyone.\n\
         • Everyone has their own trash bag and takes it out themselves.",
    ),
    (
        "Fridge",
        "• Shelf space is split evenly between housemates.\n\
         • If someone fills it with their own things, the others may leave\n\
         their food outside.",
    ),
    (
        "Bathroom",
        "• Wipe the floor dry after showering.\n\
         • Keep the window open for airflow.\n\
         • Don't leave soap or shampoo inside, the space is tight.\n\
         • <mark>Use freshener or cleaner regularly.</mark>\n\
         • The toilet seat and hose stay clean at all times.",
    ),
    (
        "Cleaning & shared products",
        "• Everyone cleans their own room.\n\
         • A smell reaching the hallway gets cleaned up immediately.\n\
         • Things bought together are available to everyone.\n\
         • <b>Use shared products fairly</b> and only as needed.\n\
         • Never finish a shared product in one go.",
    ),
    (
        "Privacy & respect",
        "• <b>Knock before entering any room.</b>\n\
         • Never take or borrow anything without permission.\n\
         • If there is a problem → talk to the admin directly or send a message.",
    ),
];

/// Populate an empty rules table with the default set. Runs inside one
/// transaction: a concurrent reader sees either no rules yet or the full
/// seeded set, and a second call is a no-op. Returns how many rules were
/// written.
pub fn seed_default_rules(db: &Database) -> Result<usize> {
    db.with_conn_mut(|conn| {
        let tx = conn.transaction()?;

        let count: i64 = tx.query_row("SELECT COUNT(*) FROM rules", [], |r| r.get(0))?;
        if count > 0 {
            return Ok(0);
        }

        let now = Utc::now().to_rfc3339();
        for (i, (title, content)) in DEFAULT_RULES.iter().enumerate() {
            tx.execute(
                "INSERT INTO rules (id, title, content, display_order, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                params![
                    Uuid::new_v4().to_string(),
                    title,
                    content,
                    (i + 1) as i64,
                    now
                ],
            )?;
        }
        tx.commit()?;

        info!("Seeded {} default house rules", DEFAULT_RULES.len());
        Ok(DEFAULT_RULES.len())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeds_seven_rules_in_order() {
        let db = Database::open_in_memory().unwrap();
        assert_eq!(seed_default_rules(&db).unwrap(), 7);

        let rules = db.list_rules().unwrap();
        assert_eq!(rules.len(), 7);
        let orders: Vec<i64> = rules.iter().map(|r| r.display_order).collect();
        assert_eq!(orders, [1, 2, 3, 4, 5, 6, 7]);

        // every rule got its own id
        let mut ids: Vec<&str> = rules.iter().map(|r| r.id.as_str()).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 7);
    }

    #[test]
    fn second_seed_is_a_no_op() {
        let db = Database::open_in_memory().unwrap();
        seed_default_rules(&db).unwrap();
        assert_eq!(seed_default_rules(&db).unwrap(), 0);
        assert_eq!(db.count_rules().unwrap(), 7);
    }

    #[test]
    fn seed_respects_rules_added_by_hand() {
        let db = Database::open_in_memory().unwrap();
        db.insert_rule("custom", "House meeting", "Sundays at noon.", 1)
            .unwrap();

        assert_eq!(seed_default_rules(&db).unwrap(), 0);
        assert_eq!(db.count_rules().unwrap(), 1);
    }
}
