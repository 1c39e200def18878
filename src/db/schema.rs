diesel::table! {
    products (id) {
        id -> Integer,
        product_code -> Text,
        title -> Text,
        brand -> Text,
        image -> Text,
        current_price -> Double,
        prev_price -> Double,
        url -> Text,
        created_at -> Timestamp,
        updated_at -> Timestamp,
    }
}

diesel::table! {
    price_history (id) {
        id -> Integer,
        product_id -> Integer,
        price -> Double,
        recorded_at -> Timestamp,
    }
}

diesel::joinable!(price_history -> products (product_id));

diesel::allow_tables_to_appear_in_same_query!(products, price_history);
