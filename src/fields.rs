//! Setup-time resolution of the input field and of each output field's semantic role.

use crate::config::TransformContext;
use crate::error::{TransformError, TransformResult};
use crate::types::{DataType, Field, FieldId, Schema};

/// What a geocoding result contributes to an output field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SemanticRole {
    PartialMatch,
    Latitude,
    Longitude,
    LocationType,
    PlaceId,
    State,
    Country,
    PostalCode,
    FormattedAddress,
}

impl SemanticRole {
    /// Role for an output field name (case-insensitive); `None` for names with no role.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "partialmatch" => Some(Self::PartialMatch),
            "lat" | "latitude" => Some(Self::Latitude),
            "lon" | "long" | "longitude" => Some(Self::Longitude),
            "type" | "locationtype" => Some(Self::LocationType),
            "place" | "placeid" => Some(Self::PlaceId),
            "state" | "administrative_area_level_1" => Some(Self::State),
            "country" => Some(Self::Country),
            "zip" | "zipcode" | "postalcode" => Some(Self::PostalCode),
            "address" | "formattedaddress" => Some(Self::FormattedAddress),
            _ => None,
        }
    }

    /// Address component type consulted for component-backed roles.
    pub fn component_type(self) -> Option<&'static str> {
        match self {
            Self::State => Some("administrative_area_level_1"),
            Self::Country => Some("country"),
            Self::PostalCode => Some("postal_code"),
            _ => None,
        }
    }
}

/// An output field and the role it was resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputBinding {
    /// Handle of the output field.
    pub field: FieldId,
    /// Declared name.
    pub name: String,
    /// Resolved role, `None` when the name is not recognized (never written).
    pub role: Option<SemanticRole>,
}

/// Fields a transform reads and writes, resolved once at setup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedFields {
    /// Field supplying the query text.
    pub input: FieldId,
    /// Declared output fields, in declaration order.
    pub outputs: Vec<OutputBinding>,
}

impl ResolvedFields {
    /// Bindings with a recognized role.
    pub fn bound(&self) -> impl Iterator<Item = (FieldId, SemanticRole)> + '_ {
        self.outputs
            .iter()
            .filter_map(|b| b.role.map(|role| (b.field, role)))
    }
}

/// Which transform is being set up; the geocode variant needs latitude/longitude outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    Geocode,
    Place,
}

impl Variant {
    /// Name used in log and error messages.
    pub fn label(self) -> &'static str {
        match self {
            Self::Geocode => "google-geocode",
            Self::Place => "google-place",
        }
    }
}

/// Check the declared output fields and resolve input and outputs against the schema.
pub fn resolve(context: &TransformContext, variant: Variant) -> TransformResult<ResolvedFields> {
    let declared = &context.operation.fields;
    if declared.is_empty() {
        return Err(TransformError::configuration(format!(
            "The {} transform requires a collection of output fields; namely: latitude, longitude, and formattedaddress (optional).",
            variant.label()
        )));
    }

    if variant == Variant::Geocode {
        require_double(declared, &["lat", "latitude"], "lat, or latitude", variant)?;
        require_double(
            declared,
            &["lon", "long", "longitude"],
            "lon, long, or longitude",
            variant,
        )?;
    }

    let input = resolve_input(&context.schema, &context.field)?;

    let outputs = declared
        .iter()
        .map(|field| {
            let id = context.schema.field_id(&field.name).ok_or_else(|| {
                TransformError::configuration(format!(
                    "The {} output field '{}' is not defined on the entity.",
                    variant.label(),
                    field.name
                ))
            })?;
            Ok(OutputBinding {
                field: id,
                name: field.name.clone(),
                role: SemanticRole::from_name(&field.name),
            })
        })
        .collect::<TransformResult<Vec<_>>>()?;

    Ok(ResolvedFields { input, outputs })
}

fn require_double(
    declared: &[Field],
    names: &[&str],
    described: &str,
    variant: Variant,
) -> TransformResult<()> {
    let field = declared
        .iter()
        .find(|f| names.contains(&f.name.to_lowercase().as_str()))
        .ok_or_else(|| {
            TransformError::configuration(format!(
                "The {} transform requires an output field named {described}.",
                variant.label()
            ))
        })?;

    if field.data_type != DataType::Float64 {
        return Err(TransformError::configuration(format!(
            "The {} {} field must be of type double.",
            variant.label(),
            field.name
        )));
    }
    Ok(())
}

fn resolve_input(schema: &Schema, name: &str) -> TransformResult<FieldId> {
    match schema.field_ids(name).as_slice() {
        [single] => Ok(*single),
        [] => Err(TransformError::configuration(format!(
            "input field '{name}' is not defined on the entity"
        ))),
        _ => Err(TransformError::configuration(format!(
            "input field '{name}' is ambiguous; expected exactly one field with that name"
        ))),
    }
}
