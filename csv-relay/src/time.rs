pub trait TimeSource {
    // Wall-clock stamp recorded on each emitted record, RFC 3339 UTC
    fn date_stamp(&self) -> String;
}

#[derive(Clone)]
pub struct SystemTime {}

impl TimeSource for SystemTime {
    fn date_stamp(&self) -> String {
        let time = time::OffsetDateTime::now_utc();

        time.format(&time::format_description::well_known::Rfc3339)
            .expect("failed to format timestamp")
    }
}
