use fake::Fake;
use fake::faker::address::raw::{CityName, CountryName, ZipCode};
use fake::faker::internet::raw::{SafeEmail, Username};
use fake::faker::lorem::raw::{Sentence, Word};
use fake::faker::name::raw::{FirstName, LastName, Name};
use fake::locales::{EN, FR_FR, PT_BR};
use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::locale::LocaleKey;
use crate::value::GeneratedValue;

/// Provider categories understood by the `faker` strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FakerProvider {
    FirstName,
    LastName,
    FullName,
    Email,
    Username,
    PhoneE164,
    Price,
    City,
    Country,
    Zip,
    Word,
    Sentence,
}

impl FakerProvider {
    pub const ALL: &'static [FakerProvider] = &[
        FakerProvider::FirstName,
        FakerProvider::LastName,
        FakerProvider::FullName,
        FakerProvider::Email,
        FakerProvider::Username,
        FakerProvider::PhoneE164,
        FakerProvider::Price,
        FakerProvider::City,
        FakerProvider::Country,
        FakerProvider::Zip,
        FakerProvider::Word,
        FakerProvider::Sentence,
    ];

    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "name.firstName" => Some(Self::FirstName),
            "name.lastName" => Some(Self::LastName),
            "name.fullName" => Some(Self::FullName),
            "internet.email" => Some(Self::Email),
            "internet.username" => Some(Self::Username),
            "phone.e164" => Some(Self::PhoneE164),
            "commerce.price" => Some(Self::Price),
            "address.city" => Some(Self::City),
            "address.country" => Some(Self::Country),
            "address.zip" => Some(Self::Zip),
            "lorem.word" => Some(Self::Word),
            "lorem.sentence" => Some(Self::Sentence),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::FirstName => "name.firstName",
            Self::LastName => "name.lastName",
            Self::FullName => "name.fullName",
            Self::Email => "internet.email",
            Self::Username => "internet.username",
            Self::PhoneE164 => "phone.e164",
            Self::Price => "commerce.price",
            Self::City => "address.city",
            Self::Country => "address.country",
            Self::Zip => "address.zip",
            Self::Word => "lorem.word",
            Self::Sentence => "lorem.sentence",
        }
    }
}

macro_rules! with_locale {
    ($locale:expr, $faker:ident $(, $arg:expr)*; $rng:expr) => {
        match $locale {
            LocaleKey::EnUs => $faker(EN $(, $arg)*).fake_with_rng::<String, _>($rng),
            LocaleKey::FrFr => $faker(FR_FR $(, $arg)*).fake_with_rng::<String, _>($rng),
            LocaleKey::PtBr => $faker(PT_BR $(, $arg)*).fake_with_rng::<String, _>($rng),
        }
    };
}

/// Generates a realistic value for `provider`; unknown names yield a lorem word.
pub fn fake_value(provider: &str, locale: LocaleKey, rng: &mut ChaCha8Rng) -> GeneratedValue {
    let Some(provider) = FakerProvider::parse(provider) else {
        return GeneratedValue::Text(with_locale!(locale, Word; rng));
    };
    match provider {
        FakerProvider::FirstName => GeneratedValue::Text(with_locale!(locale, FirstName; rng)),
        FakerProvider::LastName => GeneratedValue::Text(with_locale!(locale, LastName; rng)),
        FakerProvider::FullName => GeneratedValue::Text(with_locale!(locale, Name; rng)),
        FakerProvider::Email => GeneratedValue::Text(with_locale!(locale, SafeEmail; rng)),
        FakerProvider::Username => GeneratedValue::Text(with_locale!(locale, Username; rng)),
        FakerProvider::PhoneE164 => GeneratedValue::Text(e164(locale, rng)),
        FakerProvider::Price => {
            let cents = rng.random_range(100..=50_000_i64);
            GeneratedValue::Float(cents as f64 / 100.0)
        }
        FakerProvider::City => GeneratedValue::Text(with_locale!(locale, CityName; rng)),
        FakerProvider::Country => GeneratedValue::Text(with_locale!(locale, CountryName; rng)),
        FakerProvider::Zip => GeneratedValue::Text(with_locale!(locale, ZipCode; rng)),
        FakerProvider::Word => GeneratedValue::Text(with_locale!(locale, Word; rng)),
        FakerProvider::Sentence => {
            GeneratedValue::Text(with_locale!(locale, Sentence, 3..8; rng))
        }
    }
}

fn e164(locale: LocaleKey, rng: &mut ChaCha8Rng) -> String {
    let (country, digits) = match locale {
        LocaleKey::EnUs => ("1", 10),
        LocaleKey::FrFr => ("33", 9),
        LocaleKey::PtBr => ("55", 11),
    };
    let mut number = format!("+{country}{}", rng.random_range(1..=9_u8));
    for _ in 1..digits {
        number.push(char::from(b'0' + rng.random_range(0..=9_u8)));
    }
    number
}
