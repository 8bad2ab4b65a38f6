// ============================================================================
// FORMULAIRE DE PLAINTE : règles de validation
// ============================================================================
//
// Description:
//   Table de règles typée pour les champs texte du formulaire multipart,
//   catalogue (types, sous-types, sites, agences) et contraintes fichiers.
//
// Points d'attention:
//   - Toutes les violations sont accumulées, jamais d'arrêt au premier échec
//   - Les erreurs fichiers s'ajoutent à la même liste que les erreurs champs
//   - Les libellés ("Phone Number", "Company Name"...) sont les noms des
//     champs multipart envoyés par le frontend
//
// ============================================================================

use std::collections::HashMap;

use validator::ValidateEmail;

use super::uploads::StagedFile;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldFormat {
    Email,
    TenDigitPhone,
}

impl FieldFormat {
    fn matches(&self, value: &str) -> bool {
        match self {
            FieldFormat::Email => value.validate_email(),
            FieldFormat::TenDigitPhone => value.len() == 10 && value.chars().all(|c| c.is_ascii_digit()),
        }
    }
}

/// Attribut de destination d'un champ validé
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComplaintField {
    Name,
    UserEmail,
    Phone,
    ComplaintType,
    ComplaintSubType,
    Location,
    CompanyAddress,
    Title,
    Description,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub label: &'static str,
    pub target: ComplaintField,
    pub required: bool,
    pub max_length: Option<usize>,
    pub format: Option<FieldFormat>,
    pub format_message: Option<&'static str>,
}

impl FieldRule {
    const fn text(label: &'static str, target: ComplaintField, required: bool, max_length: Option<usize>) -> Self {
        FieldRule {
            label,
            target,
            required,
            max_length,
            format: None,
            format_message: None,
        }
    }

    const fn formatted(label: &'static str, target: ComplaintField, format: FieldFormat, message: &'static str) -> Self {
        FieldRule {
            label,
            target,
            required: true,
            max_length: None,
            format: Some(format),
            format_message: Some(message),
        }
    }

    /// Valide une valeur déjà trimée ; `Ok(None)` si le champ optionnel est vide
    pub fn check<'a>(&self, value: &'a str) -> Result<Option<&'a str>, String> {
        if value.is_empty() {
            return if self.required {
                Err(format!("{} is required", self.label))
            } else {
                Ok(None)
            };
        }

        if let Some(max) = self.max_length {
            if value.chars().count() > max {
                return Err(format!("{} must be less than {} characters", self.label, max));
            }
        }

        if let Some(format) = self.format {
            if !format.matches(value) {
                return Err(self
                    .format_message
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("Invalid {} format", self.label)));
            }
        }

        Ok(Some(value))
    }
}

pub const COMPLAINT_FIELDS: [FieldRule; 9] = [
    FieldRule::text("Name", ComplaintField::Name, true, Some(100)),
    FieldRule::formatted(
        "Email",
        ComplaintField::UserEmail,
        FieldFormat::Email,
        "Please enter a valid email address",
    ),
    FieldRule::formatted(
        "Phone Number",
        ComplaintField::Phone,
        FieldFormat::TenDigitPhone,
        "Phone number must be 10 digits",
    ),
    FieldRule::text("Complaint Type", ComplaintField::ComplaintType, true, None),
    FieldRule::text("Complaint Sub-Type", ComplaintField::ComplaintSubType, false, None),
    FieldRule::text("Location", ComplaintField::Location, true, None),
    FieldRule::text("Company Name", ComplaintField::CompanyAddress, true, None),
    FieldRule::text("Title", ComplaintField::Title, true, Some(200)),
    FieldRule::text("Description", ComplaintField::Description, true, Some(2000)),
];

/// Valeurs validées, prêtes à être persistées
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComplaintDraft {
    pub name: String,
    pub user_email: String,
    pub phone: String,
    pub complaint_type: String,
    pub complaint_sub_type: Option<String>,
    pub location: String,
    pub company_address: String,
    pub title: String,
    pub description: String,
}

impl ComplaintDraft {
    fn set(&mut self, field: ComplaintField, value: String) {
        match field {
            ComplaintField::Name => self.name = value,
            ComplaintField::UserEmail => self.user_email = value.to_lowercase(),
            ComplaintField::Phone => self.phone = value,
            ComplaintField::ComplaintType => self.complaint_type = value,
            ComplaintField::ComplaintSubType => self.complaint_sub_type = Some(value),
            ComplaintField::Location => self.location = value,
            ComplaintField::CompanyAddress => self.company_address = value,
            ComplaintField::Title => self.title = value,
            ComplaintField::Description => self.description = value,
        }
    }
}

// ---------------------------------------------------------------- catalogue

pub struct ComplaintCategory {
    pub name: &'static str,
    pub sub_types: &'static [&'static str],
}

pub struct Site {
    pub location: &'static str,
    pub branches: &'static [&'static str],
}

pub const CATEGORIES: &[ComplaintCategory] = &[
    ComplaintCategory {
        name: "Hardware",
        sub_types: &["Hard Disk Issue", "Motherboard Issue", "Keyboard Problem", "Monitor Issue"],
    },
    ComplaintCategory {
        name: "Software",
        sub_types: &["Addmobe Issue", "MS Office Related", "Operating System", "Application Crash"],
    },
    ComplaintCategory {
        name: "Network",
        sub_types: &["WiFi Not Working", "LAN Not Working", "Connection Drops", "Slow Speed"],
    },
];

pub const SITES: &[Site] = &[
    Site {
        location: "Delhi",
        branches: &["70A/32, 3rd floor, Rama Road, Kirti Nagar, Delhi-110015"],
    },
    Site {
        location: "Noida",
        branches: &["PLOT NO - 56, 6C, C Block, Phase 2, C Block, Sector 62, Noida"],
    },
];

fn canonical<'a>(options: impl IntoIterator<Item = &'a str>, value: &str) -> Option<&'a str> {
    options.into_iter().find(|o| o.eq_ignore_ascii_case(value))
}

/// Vérifie le draft contre le catalogue et remplace les valeurs par leur forme canonique
fn check_catalog(draft: &mut ComplaintDraft, errors: &mut Vec<String>) {
    if !draft.complaint_type.is_empty() {
        match CATEGORIES.iter().find(|c| c.name.eq_ignore_ascii_case(&draft.complaint_type)) {
            None => errors.push(format!(
                "Complaint Type must be one of: {}",
                CATEGORIES.iter().map(|c| c.name).collect::<Vec<_>>().join(", ")
            )),
            Some(category) => {
                draft.complaint_type = category.name.to_string();
                if let Some(sub_type) = draft.complaint_sub_type.as_mut() {
                    match canonical(category.sub_types.iter().copied(), sub_type) {
                        Some(found) => *sub_type = found.to_string(),
                        None => errors.push(format!(
                            "Complaint Sub-Type \"{}\" is not valid for {}",
                            sub_type, category.name
                        )),
                    }
                }
            }
        }
    }

    if !draft.location.is_empty() {
        match SITES.iter().find(|s| s.location.eq_ignore_ascii_case(&draft.location)) {
            None => errors.push(format!(
                "Location must be one of: {}",
                SITES.iter().map(|s| s.location).collect::<Vec<_>>().join(", ")
            )),
            Some(site) => {
                draft.location = site.location.to_string();
                if !draft.company_address.is_empty() {
                    match canonical(site.branches.iter().copied(), &draft.company_address) {
                        Some(found) => draft.company_address = found.to_string(),
                        None => errors.push(format!("Company Name must be a branch in {}", site.location)),
                    }
                }
            }
        }
    }
}

/// Valide tous les champs texte ; renvoie le draft et la liste complète des erreurs
pub fn validate_fields(fields: &HashMap<String, String>) -> (ComplaintDraft, Vec<String>) {
    let mut draft = ComplaintDraft::default();
    let mut errors = Vec::new();

    for rule in COMPLAINT_FIELDS.iter() {
        let value = fields.get(rule.label).map(|v| v.trim()).unwrap_or_default();
        match rule.check(value) {
            Ok(Some(valid)) => draft.set(rule.target, valid.to_string()),
            Ok(None) => {}
            Err(message) => errors.push(message),
        }
    }

    check_catalog(&mut draft, &mut errors);
    (draft, errors)
}

// ---------------------------------------------------------------- fichiers

#[derive(Debug, Clone)]
pub struct FileRules {
    pub max_count: usize,
    pub max_file_size: u64,
    pub max_total_size: u64,
    pub allowed_types: &'static [&'static str],
}

pub const MAX_FILE_SIZE: u64 = 5 * 1024 * 1024; // 5MB
pub const MAX_TOTAL_FILE_SIZE: u64 = 20 * 1024 * 1024; // 20MB
pub const ALLOWED_FILE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif", "application/pdf"];

impl FileRules {
    pub fn with_max_count(max_count: usize) -> Self {
        FileRules {
            max_count,
            max_file_size: MAX_FILE_SIZE,
            max_total_size: MAX_TOTAL_FILE_SIZE,
            allowed_types: ALLOWED_FILE_TYPES,
        }
    }
}

impl Default for FileRules {
    fn default() -> Self {
        FileRules::with_max_count(5)
    }
}

/// `received` compte aussi les fichiers au-delà de la limite, qui n'ont pas été stockés
pub fn validate_files(rules: &FileRules, files: &[StagedFile], received: usize) -> Vec<String> {
    let mut errors = Vec::new();

    if received > rules.max_count {
        errors.push(format!("Maximum {} files allowed", rules.max_count));
        return errors;
    }

    let mut total: u64 = 0;
    for file in files {
        if file.size > rules.max_file_size {
            errors.push(format!(
                "File \"{}\" exceeds {}MB limit",
                file.original_name,
                rules.max_file_size / (1024 * 1024)
            ));
            continue;
        }

        if !rules.allowed_types.contains(&file.content_type.as_str()) {
            errors.push(format!("File type not supported: {}", file.original_name));
            continue;
        }

        total += file.size;
        if total > rules.max_total_size {
            errors.push(format!(
                "Total attachments size exceeds {}MB limit",
                rules.max_total_size / (1024 * 1024)
            ));
            break;
        }
    }

    errors
}
