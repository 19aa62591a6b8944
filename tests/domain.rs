use sw_vehicle_installer::domain::{InstallRequest, WorkshopId};
use sw_vehicle_installer::error::InstallError;

use assert_matches::assert_matches;

#[test]
fn extracts_id_parameter_anywhere() {
    let inputs = [
        "id=12345",
        "https://steamcommunity.com/sharedfiles/filedetails/?id=12345",
        "https://steamcommunity.com/sharedfiles/filedetails/?id=12345&searchtext=truck",
        "steam://url/CommunityFilePage/?foo=1&id=12345",
        "  junk id=12345 junk  ",
    ];
    for input in inputs {
        let id = WorkshopId::extract(input).unwrap();
        assert_eq!(id.as_str(), "12345", "input {input:?}");
    }
}

#[test]
fn accepts_bare_digits_with_surrounding_whitespace() {
    for (input, expected) in [("12345", "12345"), ("  3000111222\n", "3000111222"), ("\t7 ", "7")] {
        assert_eq!(WorkshopId::extract(input).unwrap().as_str(), expected);
    }
}

#[test]
fn rejects_everything_else() {
    for input in ["abc", "", "id=", "12a34", "1 2", "?id=abc", "-5"] {
        assert!(WorkshopId::extract(input).is_none(), "input {input:?}");
    }
    assert_matches!(
        "nope".parse::<WorkshopId>(),
        Err(InstallError::InvalidItemId(value)) if value == "nope"
    );
}

#[test]
fn request_requires_every_input() {
    assert!(InstallRequest::new("/w", "1", "http://x").has_all_inputs());
    assert!(!InstallRequest::new("", "1", "http://x").has_all_inputs());
    assert!(!InstallRequest::new("/w", "", "http://x").has_all_inputs());
    assert!(!InstallRequest::new("/w", "1", "").has_all_inputs());
}
