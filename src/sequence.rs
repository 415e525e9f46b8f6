//! Nucleotide sequence utilities

/// Complement a single uppercase or lowercase nucleotide
///
/// Non-ACGT bytes pass through unchanged.
pub fn complement(base: u8) -> u8 {
    match base {
        b'A' => b'T',
        b'T' => b'A',
        b'G' => b'C',
        b'C' => b'G',
        b'a' => b't',
        b't' => b'a',
        b'g' => b'c',
        b'c' => b'g',
        _ => base,
    }
}

/// Reverse complement a DNA sequence
///
/// # Examples
///
/// ```
/// use ferro_uorf::sequence::reverse_complement;
///
/// assert_eq!(reverse_complement(b"ATGC"), b"GCAT".to_vec());
/// assert_eq!(reverse_complement(b"ATGN"), b"NCAT".to_vec());
/// ```
pub fn reverse_complement(seq: &[u8]) -> Vec<u8> {
    seq.iter().rev().map(|&b| complement(b)).collect()
}

/// True when every byte is one of `A`, `C`, `G`, `T`
pub fn is_acgt(seq: &[u8]) -> bool {
    seq.iter().all(|b| matches!(b, b'A' | b'C' | b'G' | b'T'))
}

/// Uppercase a sequence read from a table or input row
pub fn normalize(seq: &str) -> Vec<u8> {
    seq.trim().bytes().map(|b| b.to_ascii_uppercase()).collect()
}

/// Lossless view of a byte sequence for display
pub fn as_str(seq: &[u8]) -> String {
    String::from_utf8_lossy(seq).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reverse_complement_basic() {
        assert_eq!(reverse_complement(b"AACG"), b"CGTT".to_vec());
        assert!(reverse_complement(b"").is_empty());
    }

    #[test]
    fn test_reverse_complement_lowercase() {
        assert_eq!(reverse_complement(b"aattggcc"), b"ggccaatt".to_vec());
    }

    #[test]
    fn test_is_acgt() {
        assert!(is_acgt(b"ACGT"));
        assert!(!is_acgt(b"ACGN"));
        assert!(!is_acgt(b"acgt"));
        assert!(is_acgt(b""));
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(" atgC\n"), b"ATGC".to_vec());
        assert_eq!(as_str(b"ATG"), "ATG");
    }
}
