//! Queryable fields per resource: the API name clients filter and sort on,
//! the backing column, and how query string values are typed.

use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
    Bool,
    Uuid,
    Timestamp,
    TextArray,
}

impl FieldKind {
    /// Postgres type a text-bound parameter is cast to when compared against
    /// a column of this kind. Numbers and booleans bind natively.
    pub fn sql_cast(&self) -> Option<&'static str> {
        match self {
            FieldKind::Text | FieldKind::TextArray => Some("text"),
            FieldKind::Uuid => Some("uuid"),
            FieldKind::Timestamp => Some("timestamptz"),
            FieldKind::Number | FieldKind::Bool => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub column: &'static str,
    pub kind: FieldKind,
}

const fn field(name: &'static str, column: &'static str, kind: FieldKind) -> FieldSpec {
    FieldSpec { name, column, kind }
}

#[derive(Debug)]
pub struct ResourceSchema {
    pub table: &'static str,
    pub fields: &'static [FieldSpec],
}

impl ResourceSchema {
    pub fn field(&self, name: &str) -> Option<&'static FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Column name to parameter cast, for every field that needs one.
    pub fn casts(&self) -> BTreeMap<&'static str, &'static str> {
        self.fields.iter().filter_map(|f| Some((f.column, f.kind.sql_cast()?))).collect()
    }
}

use FieldKind::*;

pub static BOOTCAMPS: ResourceSchema = ResourceSchema {
    table: "bootcamps",
    fields: &[
        field("id", "id", Uuid),
        field("name", "name", Text),
        field("slug", "slug", Text),
        field("description", "description", Text),
        field("website", "website", Text),
        field("phone", "phone", Text),
        field("email", "email", Text),
        field("address", "address", Text),
        field("location.city", "location_city", Text),
        field("location.state", "location_state", Text),
        field("location.zipcode", "location_zipcode", Text),
        field("location.country", "location_country", Text),
        field("careers", "careers", TextArray),
        field("averageRating", "average_rating", Number),
        field("averageCost", "average_cost", Number),
        field("housing", "housing", Bool),
        field("jobAssistance", "job_assistance", Bool),
        field("jobGuarantee", "job_guarantee", Bool),
        field("acceptGi", "accept_gi", Bool),
        field("createdAt", "created_at", Timestamp),
        field("user", "user_id", Uuid),
    ],
};

pub static COURSES: ResourceSchema = ResourceSchema {
    table: "courses",
    fields: &[
        field("id", "id", Uuid),
        field("title", "title", Text),
        field("description", "description", Text),
        field("weeks", "weeks", Text),
        field("tuition", "tuition", Number),
        field("minimumSkill", "minimum_skill", Text),
        field("scholarshipAvailable", "scholarship_available", Bool),
        field("createdAt", "created_at", Timestamp),
        field("bootcamp", "bootcamp_id", Uuid),
        field("user", "user_id", Uuid),
    ],
};

pub static REVIEWS: ResourceSchema = ResourceSchema {
    table: "reviews",
    fields: &[
        field("id", "id", Uuid),
        field("title", "title", Text),
        field("text", "text", Text),
        field("rating", "rating", Number),
        field("createdAt", "created_at", Timestamp),
        field("bootcamp", "bootcamp_id", Uuid),
        field("user", "user_id", Uuid),
    ],
};

pub static USERS: ResourceSchema = ResourceSchema {
    table: "users",
    fields: &[
        field("id", "id", Uuid),
        field("name", "name", Text),
        field("email", "email", Text),
        field("role", "role", Text),
        field("createdAt", "created_at", Timestamp),
    ],
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn casts_follow_column_kinds() {
        let casts = COURSES.casts();
        assert_eq!(casts.get("id"), Some(&"uuid"));
        assert_eq!(casts.get("bootcamp_id"), Some(&"uuid"));
        assert_eq!(casts.get("created_at"), Some(&"timestamptz"));
        assert_eq!(casts.get("weeks"), Some(&"text"));
        assert_eq!(casts.get("tuition"), None);
        assert_eq!(casts.get("scholarship_available"), None);
        assert_eq!(BOOTCAMPS.casts().get("careers"), Some(&"text"));
    }
}
