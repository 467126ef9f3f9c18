//! Idempotency key derivation
//!
//! Up to three keys are derived per `(order, kind)` send so that an order
//! whose id churns under spreadsheet edits is still recognized by its
//! phone number or customer name. A send is blocked if any one key is
//! already recorded; a successful send records all of them.

use mursal_common::MessageKind;

/// Derive the idempotency keys for a send.
///
/// Empty inputs contribute no key. The order id and name are trimmed; the
/// phone is reduced to digits.
#[must_use]
pub fn derive_keys(
    order_id: &str,
    kind: MessageKind,
    phone: Option<&str>,
    name: Option<&str>,
) -> Vec<String> {
    let mut keys = Vec::with_capacity(3);

    let order_id = order_id.trim();
    if !order_id.is_empty() {
        keys.push(format!("msg:order:{kind}:{order_id}"));
    }

    if let Some(phone) = phone {
        let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
        if !digits.is_empty() {
            keys.push(format!("msg:phone:{kind}:{digits}"));
        }
    }

    if let Some(name) = name {
        let name = name.trim();
        if !name.is_empty() {
            keys.push(format!("msg:name:{kind}:{name}"));
        }
    }

    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_three_keys_derived() {
        let keys = derive_keys(
            "A-1",
            MessageKind::NewOrder,
            Some("+20 123 456 7890"),
            Some("سارة"),
        );
        assert_eq!(
            keys,
            vec![
                "msg:order:newOrder:A-1",
                "msg:phone:newOrder:201234567890",
                "msg:name:newOrder:سارة",
            ]
        );
    }

    #[test]
    fn test_empty_inputs_contribute_no_key() {
        let keys = derive_keys("  ", MessageKind::Shipped, Some(""), None);
        assert!(keys.is_empty());

        let keys = derive_keys("A-1", MessageKind::Shipped, None, Some("   "));
        assert_eq!(keys, vec!["msg:order:shipped:A-1"]);
    }

    #[test]
    fn test_kind_separates_namespaces() {
        let new_order = derive_keys("A-1", MessageKind::NewOrder, None, None);
        let reminder = derive_keys("A-1", MessageKind::Reminder, None, None);
        assert_ne!(new_order, reminder);
    }

    #[test]
    fn test_phone_reduced_to_digits() {
        let keys = derive_keys("", MessageKind::NoAnswer, Some("(012) 345-6789"), None);
        assert_eq!(keys, vec!["msg:phone:noAnswer:0123456789"]);
    }
}
