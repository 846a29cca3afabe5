diesel::table! {
    subscribers (chat_id) {
        chat_id -> Text,
        username -> Nullable<Text>,
        first_name -> Nullable<Text>,
        last_name -> Nullable<Text>,
        language -> Text,
        plan -> Text,
        is_active -> Bool,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    subscription_queries (id) {
        id -> Text,
        chat_id -> Text,
        refuge -> Text,
        date_from -> Nullable<Date>,
        date_to -> Nullable<Date>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::joinable!(subscription_queries -> subscribers (chat_id));

diesel::allow_tables_to_appear_in_same_query!(subscribers, subscription_queries);
