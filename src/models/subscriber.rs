use crate::domain::{ChatId, Language, Plan, Subscriber};
use crate::schema::subscribers;
use chrono::offset::Utc;
use chrono::DateTime;
use diesel::{Insertable, Queryable, Selectable};

#[derive(Queryable, Selectable)]
#[diesel(table_name = subscribers)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SubscriberRow {
    pub chat_id: String,
    pub username: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub language: String,
    pub plan: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = subscribers)]
pub struct NewSubscriberRow<'a> {
    pub chat_id: &'a str,
    pub username: Option<&'a str>,
    pub first_name: Option<&'a str>,
    pub last_name: Option<&'a str>,
    pub language: &'a str,
    pub plan: &'a str,
    pub is_active: bool,
    pub created_at: &'a DateTime<Utc>,
    pub updated_at: &'a DateTime<Utc>,
}

impl TryFrom<SubscriberRow> for Subscriber {
    type Error = String;

    fn try_from(row: SubscriberRow) -> Result<Self, Self::Error> {
        Ok(Subscriber {
            chat_id: ChatId::parse(row.chat_id)?,
            username: row.username,
            first_name: row.first_name,
            last_name: row.last_name,
            language: Language::detect(&row.language).unwrap_or_default(),
            plan: Plan::parse(&row.plan),
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
