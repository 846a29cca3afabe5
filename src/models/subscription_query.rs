use crate::domain::{ChatId, DateRange, LocationFilter, Query};
use crate::schema::subscription_queries;
use chrono::offset::Utc;
use chrono::{DateTime, NaiveDate};
use diesel::{Insertable, Queryable, Selectable};

#[derive(Queryable, Selectable)]
#[diesel(table_name = subscription_queries)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct QueryRow {
    pub id: String,
    pub chat_id: String,
    pub refuge: String,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Insertable)]
#[diesel(table_name = subscription_queries)]
pub struct NewQueryRow<'a> {
    pub id: &'a str,
    pub chat_id: &'a str,
    pub refuge: &'a str,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub created_at: &'a DateTime<Utc>,
    pub updated_at: &'a DateTime<Utc>,
}

impl TryFrom<QueryRow> for Query {
    type Error = String;

    fn try_from(row: QueryRow) -> Result<Self, Self::Error> {
        Ok(Query {
            id: row.id,
            chat_id: ChatId::parse(row.chat_id)?,
            location: LocationFilter::parse(&row.refuge)?,
            range: DateRange {
                from: row.date_from,
                to: row.date_to,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
