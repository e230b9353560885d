// SPDX-License-Identifier: MIT OR Apache-2.0

//! Property checks for the length-prefixed event codec

use goboard_network::codec::{self, HEADER_LEN};
use goboard_network::Event;
use proptest::prelude::*;
use serde_json::json;

proptest! {
    #[test]
    fn header_matches_body_length(name in "[a-z_]{1,16}", text in ".*", user in "[a-f0-9-]{0,36}") {
        let evt = Event::new(name, json!(text)).with_user(user);
        let bytes = codec::encode(&evt).unwrap();
        let mut header = [0u8; HEADER_LEN];
        header.copy_from_slice(&bytes[..HEADER_LEN]);
        prop_assert_eq!(u32::from_le_bytes(header) as usize, bytes.len() - HEADER_LEN);
        prop_assert_eq!(codec::decode(&bytes[HEADER_LEN..]).unwrap(), evt);
    }

    #[test]
    fn garbage_bodies_never_panic(body in proptest::collection::vec(any::<u8>(), 0..256)) {
        let _ = codec::decode(&body);
    }
}
