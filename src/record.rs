use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use crate::domain::DTVError;

/// The fields of a record, in rendering order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Field {
    Id,
    Name,
    Email,
    Phone,
    Address,
    Country,
    Pin,
}

impl Field {
    pub const ALL: [Field; 7] = [
        Field::Id,
        Field::Name,
        Field::Email,
        Field::Phone,
        Field::Address,
        Field::Country,
        Field::Pin,
    ];

    /// Lower case key, also used as the column name in data files.
    pub fn key(&self) -> &'static str {
        match self {
            Field::Id => "id",
            Field::Name => "name",
            Field::Email => "email",
            Field::Phone => "phone",
            Field::Address => "address",
            Field::Country => "country",
            Field::Pin => "pin",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Field::Id => "ID",
            Field::Name => "Name",
            Field::Email => "Email",
            Field::Phone => "Phone",
            Field::Address => "Address",
            Field::Country => "Country",
            Field::Pin => "Pin",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Field {
    type Err = DTVError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Field::ALL
            .iter()
            .find(|f| f.key().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| DTVError::UnknownField(s.to_string()))
    }
}

/// Comparable value of a single field. Values of the same field always share a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Value<'a> {
    Int(i64),
    Text(&'a str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub country: String,
    pub pin: String,
}

impl Record {
    /// Generates `n` records with ids `1..=n`.
    pub fn synthetic(n: usize) -> Vec<Record> {
        (1..=n)
            .map(|i| Record {
                id: i as i64,
                name: format!("Name {i}"),
                email: format!("email{i}@example.com"),
                phone: format!("+123456789{i}"),
                address: format!("Address {i}"),
                country: format!("Country {i}"),
                pin: format!("Pin {i}"),
            })
            .collect()
    }

    pub fn value(&self, field: Field) -> Value<'_> {
        match field {
            Field::Id => Value::Int(self.id),
            Field::Name => Value::Text(&self.name),
            Field::Email => Value::Text(&self.email),
            Field::Phone => Value::Text(&self.phone),
            Field::Address => Value::Text(&self.address),
            Field::Country => Value::Text(&self.country),
            Field::Pin => Value::Text(&self.pin),
        }
    }

    /// Text representation of a field as it is rendered and searched.
    pub fn text(&self, field: Field) -> Cow<'_, str> {
        match self.value(field) {
            Value::Int(i) => Cow::Owned(i.to_string()),
            Value::Text(s) => Cow::Borrowed(s),
        }
    }

    // `needle` has to be lower case already
    pub(crate) fn matches_lowercase(&self, needle: &str) -> bool {
        Field::ALL
            .iter()
            .any(|&f| self.text(f).to_lowercase().contains(needle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_records_follow_the_naming_scheme() {
        let records = Record::synthetic(30);
        assert_eq!(records.len(), 30);
        let r = &records[14];
        assert_eq!(r.id, 15);
        assert_eq!(r.name, "Name 15");
        assert_eq!(r.email, "email15@example.com");
        assert_eq!(r.phone, "+12345678915");
        assert_eq!(r.address, "Address 15");
        assert_eq!(r.country, "Country 15");
        assert_eq!(r.pin, "Pin 15");
    }

    #[test]
    fn synthetic_with_zero_rows_is_empty() {
        assert!(Record::synthetic(0).is_empty());
    }

    #[test]
    fn id_is_compared_numerically() {
        let records = Record::synthetic(10);
        assert!(records[1].value(Field::Id) < records[9].value(Field::Id));
        // As text "10" would sort before "2"
        assert!(records[1].value(Field::Name) > records[9].value(Field::Name));
    }

    #[test]
    fn text_renders_id_as_decimal() {
        let records = Record::synthetic(12);
        assert_eq!(records[11].text(Field::Id), "12");
        assert_eq!(records[11].text(Field::Country), "Country 12");
    }

    #[test]
    fn field_parsing() {
        assert_eq!("name".parse::<Field>().unwrap(), Field::Name);
        assert_eq!("ID".parse::<Field>().unwrap(), Field::Id);
        assert!(matches!(
            "zip".parse::<Field>(),
            Err(DTVError::UnknownField(f)) if f == "zip"
        ));
    }

    #[test]
    fn fields_are_ordered_for_rendering() {
        let mut fields = Field::ALL.to_vec();
        fields.reverse();
        fields.sort();
        assert_eq!(fields, Field::ALL.to_vec());
        assert_eq!(Field::Pin.to_string(), "pin");
        assert_eq!(Field::Id.label(), "ID");
    }
}
