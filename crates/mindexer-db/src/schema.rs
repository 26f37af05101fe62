// @generated manually — hand-maintained, no Diesel CLI available in this environment.

diesel::table! {
    known_devices (uri) {
        uri -> Text,
        plugin_prefix -> Text,
        uuid -> Text,
        name -> Text,
        description -> Text,
        icon -> Text,
        enabled -> Bool,
    }
}

diesel::table! {
    plugin_settings (plugin_prefix) {
        plugin_prefix -> Text,
        enabled -> Bool,
    }
}
