//! Reversible obfuscation of numeric identifiers.
//!
//! Classic hashids scheme: a salt-shuffled alphabet, a separator set between
//! encoded numbers, guard characters for minimum-length padding, and a
//! lottery character seeding the per-number alphabet shuffle. Decoding
//! re-encodes the result and compares against the input, so tampered or
//! foreign strings come back as `None` instead of a wrong id.

use crate::errors::RepoError;

const DEFAULT_ALPHABET: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ1234567890";
const DEFAULT_SEPARATORS: &str = "cfhistuCFHISTU";
const MIN_ALPHABET_LEN: usize = 16;
const SEP_DIV: f64 = 3.5;
const GUARD_DIV: f64 = 12.0;

/// Encoder/decoder for opaque id strings.
#[derive(Debug, Clone)]
pub struct HashId {
    salt: Vec<char>,
    min_length: usize,
    alphabet: Vec<char>,
    separators: Vec<char>,
    guards: Vec<char>,
}

impl HashId {
    /// Build a codec over the default 62-character alphabet.
    #[must_use]
    pub fn new(salt: &str, min_length: usize) -> Self {
        // The default alphabet always satisfies the length check.
        Self::with_alphabet(salt, min_length, DEFAULT_ALPHABET)
            .unwrap_or_else(|_| unreachable!("default alphabet is valid"))
    }

    /// Build a codec over a custom alphabet.
    ///
    /// # Errors
    ///
    /// `BadRequest` when the alphabet has fewer than 16 unique non-space
    /// characters.
    pub fn with_alphabet(
        salt: &str,
        min_length: usize,
        alphabet: &str,
    ) -> Result<Self, RepoError> {
        let salt: Vec<char> = salt.chars().collect();

        let mut alphabet: Vec<char> = {
            let mut unique = Vec::new();
            for ch in alphabet.chars() {
                if ch != ' ' && !unique.contains(&ch) {
                    unique.push(ch);
                }
            }
            unique
        };
        if alphabet.len() < MIN_ALPHABET_LEN {
            return Err(RepoError::bad_request(format!(
                "hashid alphabet must contain at least {MIN_ALPHABET_LEN} unique characters"
            )));
        }

        let mut separators: Vec<char> = DEFAULT_SEPARATORS
            .chars()
            .filter(|ch| alphabet.contains(ch))
            .collect();
        alphabet.retain(|ch| !separators.contains(ch));
        consistent_shuffle(&mut separators, &salt);

        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        if separators.is_empty()
            || (alphabet.len() as f64 / separators.len() as f64) > SEP_DIV
        {
            let mut needed = (alphabet.len() as f64 / SEP_DIV).ceil() as usize;
            if needed == 1 {
                needed = 2;
            }
            if needed > separators.len() {
                let diff = needed - separators.len();
                separators.extend_from_slice(&alphabet[..diff]);
                alphabet.drain(..diff);
            }
        }

        consistent_shuffle(&mut alphabet, &salt);

        #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let guard_count = (alphabet.len() as f64 / GUARD_DIV).ceil() as usize;
        let guards;
        if alphabet.len() < 3 {
            guards = separators[..guard_count].to_vec();
            separators.drain(..guard_count);
        } else {
            guards = alphabet[..guard_count].to_vec();
            alphabet.drain(..guard_count);
        }

        Ok(Self {
            salt,
            min_length,
            alphabet,
            separators,
            guards,
        })
    }

    /// Encode one id.
    #[must_use]
    pub fn encode_one(&self, id: u64) -> String {
        self.encode(&[id])
    }

    /// Decode a string expected to hold exactly one id.
    #[must_use]
    pub fn decode_one(&self, input: &str) -> Option<u64> {
        match self.decode(input)?.as_slice() {
            [id] => Some(*id),
            _ => None,
        }
    }

    /// Encode a sequence of ids into one opaque string. An empty input
    /// encodes to an empty string.
    #[must_use]
    pub fn encode(&self, numbers: &[u64]) -> String {
        if numbers.is_empty() {
            return String::new();
        }

        let mut alphabet = self.alphabet.clone();
        let numbers_hash: usize = numbers
            .iter()
            .enumerate()
            .map(|(i, n)| usize::try_from(n % (i as u64 + 100)).unwrap_or(0))
            .sum();
        let lottery = alphabet[numbers_hash % alphabet.len()];

        let mut result = vec![lottery];
        for (i, &num) in numbers.iter().enumerate() {
            shuffle_for_number(&mut alphabet, lottery, &self.salt);
            let digits = to_radix(num, &alphabet);
            if i + 1 < numbers.len() {
                // Separator choice is derived from the number and its first
                // digit, so adjacent numbers cannot collide after a split.
                let sep_seed = num % (digits[0] as u64 + i as u64);
                let sep_index = usize::try_from(sep_seed).unwrap_or(0) % self.separators.len();
                result.extend_from_slice(&digits);
                result.push(self.separators[sep_index]);
            } else {
                result.extend_from_slice(&digits);
            }
        }

        if result.len() < self.min_length {
            self.pad(&mut result, numbers_hash, &mut alphabet);
        }
        result.into_iter().collect()
    }

    /// Decode an opaque string back into ids. Returns `None` for anything
    /// this codec did not produce.
    #[must_use]
    pub fn decode(&self, input: &str) -> Option<Vec<u64>> {
        if input.is_empty() {
            return None;
        }
        let chars: Vec<char> = input.chars().collect();

        let unguarded = split_on(&chars, &self.guards);
        let core = match unguarded.len() {
            2 | 3 => unguarded[1],
            _ => unguarded[0],
        };
        let (&lottery, rest) = core.split_first()?;

        let mut alphabet = self.alphabet.clone();
        let mut numbers = Vec::new();
        for sub in split_on(rest, &self.separators) {
            if sub.is_empty() {
                return None;
            }
            shuffle_for_number(&mut alphabet, lottery, &self.salt);
            numbers.push(from_radix(sub, &alphabet)?);
        }
        if numbers.is_empty() {
            return None;
        }

        // Round-trip check rejects tampered input.
        if self.encode(&numbers) != input {
            return None;
        }
        Some(numbers)
    }

    fn pad(&self, result: &mut Vec<char>, numbers_hash: usize, alphabet: &mut Vec<char>) {
        let guard_index = (numbers_hash + result[0] as usize) % self.guards.len();
        result.insert(0, self.guards[guard_index]);

        if result.len() < self.min_length {
            let guard_index = (numbers_hash + result[2] as usize) % self.guards.len();
            result.push(self.guards[guard_index]);
        }

        let half = alphabet.len() / 2;
        while result.len() < self.min_length {
            let shuffle_salt = alphabet.clone();
            consistent_shuffle(alphabet, &shuffle_salt);

            let mut padded = alphabet[half..].to_vec();
            padded.append(result);
            padded.extend_from_slice(&alphabet[..half]);
            *result = padded;

            let excess = result.len().saturating_sub(self.min_length);
            if excess > 0 {
                let start = excess / 2;
                *result = result[start..start + self.min_length].to_vec();
            }
        }
    }
}

/// Re-shuffle the working alphabet for the next number, seeded by the
/// lottery character, the salt, and the alphabet itself.
fn shuffle_for_number(alphabet: &mut Vec<char>, lottery: char, salt: &[char]) {
    let mut buffer = Vec::with_capacity(alphabet.len());
    buffer.push(lottery);
    buffer.extend_from_slice(salt);
    buffer.extend_from_slice(alphabet);
    buffer.truncate(alphabet.len());
    consistent_shuffle(alphabet, &buffer);
}

/// Salt-driven Fisher-Yates variant shared by every shuffle in the scheme.
fn consistent_shuffle(chars: &mut [char], salt: &[char]) {
    if salt.is_empty() || chars.len() < 2 {
        return;
    }
    let mut v = 0usize;
    let mut p = 0usize;
    let mut i = chars.len() - 1;
    while i > 0 {
        v %= salt.len();
        let t = salt[v] as usize;
        p += t;
        let j = (t + v + p) % i;
        chars.swap(i, j);
        i -= 1;
        v += 1;
    }
}

fn to_radix(mut num: u64, alphabet: &[char]) -> Vec<char> {
    let len = alphabet.len() as u64;
    let mut digits = Vec::new();
    loop {
        #[allow(clippy::cast_possible_truncation)]
        digits.insert(0, alphabet[(num % len) as usize]);
        num /= len;
        if num == 0 {
            break;
        }
    }
    digits
}

fn from_radix(chars: &[char], alphabet: &[char]) -> Option<u64> {
    let len = alphabet.len() as u64;
    let mut num: u64 = 0;
    for &ch in chars {
        let pos = alphabet.iter().position(|&a| a == ch)? as u64;
        num = num.checked_mul(len)?.checked_add(pos)?;
    }
    Some(num)
}

fn split_on<'a>(chars: &'a [char], set: &[char]) -> Vec<&'a [char]> {
    chars.split(|ch| set.contains(ch)).collect()
}
