use crate::i18n::Translator;
use crate::widgets::form::{FieldKind, FormField};

/// Fields that must be non-empty before the submit action runs.
pub const MANDATORY_FIELDS: [&str; 3] = ["company", "company_email", "company_description"];

/// Accounts never offered as collaborators.
pub const SYSTEM_USERS: [&str; 2] = ["Guest", "Administrator"];

pub const COMPANY_DOCTYPE: &str = "Company";
pub const USER_DOCTYPE: &str = "User";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldType {
    Data,
    Link,
    MultiSelect,
    ReadOnly,
    Text,
}

/// Change hooks a field can request. The dialog binds each tag to its own
/// handler once it exists.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OnChange {
    FetchCompanyDetails,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FieldSpec {
    pub fieldname: &'static str,
    pub label: String,
    pub fieldtype: FieldType,
    pub options: Option<&'static str>,
    pub onchange: Option<OnChange>,
}

impl FieldSpec {
    fn new(fieldname: &'static str, label: String, fieldtype: FieldType) -> Self {
        Self {
            fieldname,
            label,
            fieldtype,
            options: None,
            onchange: None,
        }
    }

    pub fn to_form_field(&self) -> FormField {
        let kind = match self.fieldtype {
            FieldType::Data => FieldKind::Data,
            FieldType::Link => FieldKind::Link {
                doctype: self.options.unwrap_or_default().to_string(),
            },
            FieldType::MultiSelect => FieldKind::MultiSelect {
                options: Vec::new(),
                cursor: 0,
                offset: 0,
            },
            FieldType::ReadOnly => FieldKind::ReadOnly,
            FieldType::Text => FieldKind::Text {
                edit_lines: 4,
                offset: 0,
            },
        };
        FormField::new(self.fieldname, self.label.clone(), kind)
    }
}

pub fn profile_fields(tr: &Translator) -> Vec<FieldSpec> {
    // TODO: check the username against the marketplace registry once it exposes a lookup
    let username = FieldSpec::new("username", tr.tr("Username"), FieldType::Data);
    let company = FieldSpec {
        options: Some(COMPANY_DOCTYPE),
        onchange: Some(OnChange::FetchCompanyDetails),
        ..FieldSpec::new("company", tr.tr("Company"), FieldType::Link)
    };
    vec![
        username,
        company,
        FieldSpec::new("company_email", tr.tr("Company Email"), FieldType::Data),
        FieldSpec::new("users", tr.tr("Users"), FieldType::MultiSelect),
        FieldSpec::new("country", tr.tr("Country"), FieldType::ReadOnly),
        FieldSpec::new("currency", tr.tr("Currency"), FieldType::ReadOnly),
        FieldSpec::new(
            "company_description",
            tr.tr("About your Company"),
            FieldType::Text,
        ),
    ]
}
