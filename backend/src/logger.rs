/// Thin entry point over the shared subscriber bootstrap so this binary
/// goes through the same `wizard_common::logging::init` every other
/// wizard-running crate uses, rather than re-declaring the builder chain.
pub fn init_tracing(json: bool) {
    wizard_common::logging::init("backend", json);
}
