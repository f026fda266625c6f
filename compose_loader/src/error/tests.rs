//! Unit tests for error rendering and context unwrapping.

use rstest::rstest;

use super::{ComposeError, ServiceRef};

fn chain(names: &[&str]) -> Vec<ServiceRef> {
    names
        .iter()
        .map(|name| ServiceRef::new("compose.yml", *name))
        .collect()
}

#[test]
fn circular_reference_renders_traversal_order() {
    let err = ComposeError::circular(chain(&["web", "base", "web"]));
    assert_eq!(
        err.to_string(),
        "Circular reference:\n  web in compose.yml\n  extends base in compose.yml\n  extends web in compose.yml"
    );
}

#[rstest]
#[case("", "No files specified", "No files specified")]
#[case("services.web", "bad shape", "services.web: bad shape")]
fn decode_prefixes_location_when_present(
    #[case] path: &str,
    #[case] message: &str,
    #[case] expected: &str,
) {
    assert_eq!(ComposeError::decode(path, message).to_string(), expected);
}

#[test]
fn innermost_skips_context_layers() {
    let inner = ComposeError::reference("web", "refers to undefined network front");
    let wrapped = ComposeError::context(
        "cannot merge services from b.yml",
        ComposeError::context("cannot merge service web", inner),
    );
    assert!(matches!(
        wrapped.innermost(),
        ComposeError::Reference { service, .. } if service == "web"
    ));
    assert_eq!(
        wrapped.to_string(),
        "cannot merge services from b.yml: cannot merge service web: service \"web\" refers to undefined network front"
    );
}

#[test]
fn figment_errors_round_trip_through_gathering() {
    let err: ComposeError = figment::Error::from("boom").into();
    assert!(matches!(err, ComposeError::Gathering(_)));
    let back: figment::Error = err.into();
    assert_eq!(back.to_string(), "boom");
}
