//! Esquema Diesel. Reemplazable con `diesel print-schema`.

diesel::table! {
    kv_entries (key) {
        key -> Text,
        value -> Text,
    }
}
