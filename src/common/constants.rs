/// Source id constants used by the CLI, config and the scraper registry.
/// Each id maps to exactly one venue listing.
pub const TAVASTIA_SOURCE: &str = "tavastia";
pub const SEMIFINAL_SOURCE: &str = "semifinal";
pub const GLIVELAB_HELSINKI_SOURCE: &str = "glivelab_helsinki";
pub const GLIVELAB_TAMPERE_SOURCE: &str = "glivelab_tampere";
pub const ON_THE_ROCKS_SOURCE: &str = "on_the_rocks";
pub const LEPAKKOMIES_SOURCE: &str = "lepakkomies";
pub const KUUDES_LINJA_SOURCE: &str = "kuudes_linja";
pub const SUISTOKLUBI_SOURCE: &str = "suistoklubi";
pub const HOUSE_OF_ROCK_SOURCE: &str = "house_of_rock";
pub const SAWOHOUSE_SOURCE: &str = "sawohouse";
pub const TAVARA_ASEMA_SOURCE: &str = "tavara_asema";
pub const KULTTUURITALO_SOURCE: &str = "kulttuuritalo";

// Venue names (as persisted in the venues table)
pub const TAVASTIA_VENUE_NAME: &str = "Tavastiaklubi";
pub const SEMIFINAL_VENUE_NAME: &str = "Semifinal";
pub const GLIVELAB_HELSINKI_VENUE_NAME: &str = "G Livelab Helsinki";
pub const GLIVELAB_TAMPERE_VENUE_NAME: &str = "G Livelab Tampere";
pub const ON_THE_ROCKS_VENUE_NAME: &str = "On The Rocks";
pub const LEPAKKOMIES_VENUE_NAME: &str = "Lepakkomies";
pub const KUUDES_LINJA_VENUE_NAME: &str = "Kuudes Linja";
pub const SUISTOKLUBI_VENUE_NAME: &str = "Suistoklubi";
pub const HOUSE_OF_ROCK_VENUE_NAME: &str = "House of rock";
pub const SAWOHOUSE_VENUE_NAME: &str = "Sawohouse";
pub const TAVARA_ASEMA_VENUE_NAME: &str = "Tavara-asema";
pub const KULTTUURITALO_VENUE_NAME: &str = "Kulttuuritalo";

// City names
pub const HELSINKI: &str = "Helsinki";
pub const TAMPERE: &str = "Tampere";
pub const HAMEENLINNA: &str = "Hämeenlinna";
pub const KOUVOLA: &str = "Kouvola";
pub const KUOPIO: &str = "Kuopio";

// Listing page URLs
pub const TAVASTIA_URL: &str = "https://tavastiaklubi.fi/?show_all=1";
pub const SEMIFINAL_URL: &str = "https://tavastiaklubi.fi/semifinal/?show_all=1";
pub const GLIVELAB_HELSINKI_URL: &str = "https://glivelab.fi/?show_all=1";
pub const GLIVELAB_TAMPERE_URL: &str = "https://glivelab.fi/tampere/?show_all=1";
pub const ON_THE_ROCKS_URL: &str = "https://www.rocks.fi/tapahtumat/";
pub const LEPAKKOMIES_URL: &str = "https://www.lepis.fi/tapahtumat/";
pub const KUUDES_LINJA_URL: &str = "https://www.kuudeslinja.com/";
pub const SUISTOKLUBI_URL: &str = "https://www.suisto.fi/";
pub const HOUSE_OF_ROCK_URL: &str = "https://houseofrockbar.fi/tapahtumat/";
pub const SAWOHOUSE_URL: &str = "https://sawohouseunderground.fi/keikkakalenteri/";
pub const TAVARA_ASEMA_URL: &str = "https://tavara-asema.fi/ohjelma/";
pub const KULTTUURITALO_URL: &str = "https://kulttuuritalo.fi/tapahtumat/";

/// Several venue sites reject default client identifiers.
pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Get all supported source ids in registration order
pub fn get_supported_sources() -> Vec<&'static str> {
    vec![
        TAVASTIA_SOURCE,
        SEMIFINAL_SOURCE,
        GLIVELAB_HELSINKI_SOURCE,
        GLIVELAB_TAMPERE_SOURCE,
        ON_THE_ROCKS_SOURCE,
        LEPAKKOMIES_SOURCE,
        KUUDES_LINJA_SOURCE,
        SUISTOKLUBI_SOURCE,
        HOUSE_OF_ROCK_SOURCE,
        SAWOHOUSE_SOURCE,
        TAVARA_ASEMA_SOURCE,
        KULTTUURITALO_SOURCE,
    ]
}
