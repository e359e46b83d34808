//! Luhn check digit (spec Glossary: "modulus-10 checksum used for IMEI
//! suffixing"), used when a binary device id is converted to an IMEI string
//! (: "convert to IMEI as `((uint16 first2) << 32) | uint32 next4`
//! and append a Luhn check digit").

/// Computes the Luhn check digit for a decimal digit string, treating the
/// rightmost existing digit as the one doubled first (standard Luhn
/// convention for appending a new check digit to the right).
pub fn luhn_check_digit(digits: &str) -> u8 {
    let mut sum = 0u32;
    for (i, ch) in digits.chars().rev().enumerate() {
        let mut d = ch.to_digit(10).unwrap_or(0);
        if i % 2 == 0 {
            d *= 2;
            if d > 9 {
                d -= 9;
            }
        }
        sum += d;
    }
    ((10 - (sum % 10)) % 10) as u8
}

/// Appends the Luhn check digit computed by [`luhn_check_digit`].
pub fn append_luhn_check_digit(digits: &str) -> String {
    let check = luhn_check_digit(digits);
    format!("{digits}{check}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_imei_check_digit() {
        // 14-digit IMEI body 49015420323751 has check digit 8.
        assert_eq!(luhn_check_digit("49015420323751"), 8);
        assert_eq!(append_luhn_check_digit("49015420323751"), "490154203237518");
    }

    #[test]
    fn all_zero_digits_check_to_zero() {
        assert_eq!(luhn_check_digit("0000000000000"), 0);
    }
}
