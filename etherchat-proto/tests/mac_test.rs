use etherchat_proto::{MacAddr, MacParseError};

#[test]
fn test_parse_colon_form() {
    let mac: MacAddr = "aa:bb:cc:dd:ee:ff".parse().unwrap();
    assert_eq!(mac.octets(), [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);
}

#[test]
fn test_parse_dash_form() {
    let mac: MacAddr = "AA-BB-CC-DD-EE-FF".parse().unwrap();
    assert_eq!(mac.octets(), [0xAA, 0xBB, 0xCC, 0xDD, 0xEE, 0xFF]);
}

#[test]
fn test_display_is_upper_colon() {
    let mac: MacAddr = "0a-1b-2c-3d-4e-5f".parse().unwrap();
    assert_eq!(mac.to_string(), "0A:1B:2C:3D:4E:5F");
}

#[test]
fn test_broadcast() {
    let mac: MacAddr = "ff:ff:ff:ff:ff:ff".parse().unwrap();
    assert!(mac.is_broadcast());
    assert_eq!(mac, MacAddr::BROADCAST);
    assert!(!"00:ff:ff:ff:ff:ff".parse::<MacAddr>().unwrap().is_broadcast());
}

#[test]
fn test_group_count_errors() {
    assert_eq!(
        "aa:bb:cc:dd:ee".parse::<MacAddr>(),
        Err(MacParseError::GroupCount(5))
    );
    assert!("aa:bb:cc:dd:ee:ff:00".parse::<MacAddr>().is_err());
    assert_eq!("".parse::<MacAddr>(), Err(MacParseError::BadGroup(String::new())));
}

#[test]
fn test_bad_group_errors() {
    assert_eq!(
        "aa:bb:cc:dd:ee:zz".parse::<MacAddr>(),
        Err(MacParseError::BadGroup("zz".to_string()))
    );
    assert!("aa:bb:cc:dd:ee:f".parse::<MacAddr>().is_err());
    assert!("aa:bb:cc:dd:ee:fff".parse::<MacAddr>().is_err());
}
