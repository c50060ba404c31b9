diesel::table! {
    reminders (id) {
        id -> BigInt,
        user_id -> BigInt,
        message -> Text,
        due_at -> BigInt,
        repeat_interval -> Nullable<BigInt>,
        created_at -> BigInt,
    }
}
