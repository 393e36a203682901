use crate::models::{CreateOntRequest, OltDevice, OntRecord, RegistrationRequest, ServiceBinding, TopologyAddress};
use crate::utils::{is_valid_serial, normalize_serial};

use super::allocator::{AddressPools, AllocationMode};
use super::pairing::pair;
use super::{EngineError, EngineResult};

/// Maximum description length accepted by the OLT
pub const MAX_DESCRIPTION_LEN: usize = 30;

/// Already-paired input for one registration
#[derive(Debug, Clone)]
pub struct RegistrationInput {
    pub address: TopologyAddress,
    pub mode: AllocationMode,
    pub serial_number: String,
    pub bindings: Vec<ServiceBinding>,
    pub description: Option<String>,
}

/// Build a registration from the operator's form
pub fn request_from_form(
    device: &OltDevice,
    inventory: &[OntRecord],
    form: &CreateOntRequest,
) -> EngineResult<RegistrationRequest> {
    let bindings = pair(&form.gem_ports, &form.vlans)?;
    compose(
        device,
        inventory,
        RegistrationInput {
            address: form.address,
            mode: form.ont_id.into(),
            serial_number: form.serial_number.clone(),
            bindings,
            description: form.description.clone(),
        },
    )
}

/// Validate serial and description, allocate the id against the port's own
/// pool and render the registration code.
pub fn compose(device: &OltDevice, inventory: &[OntRecord], input: RegistrationInput) -> EngineResult<RegistrationRequest> {
    let serial_number = checked_serial(&input.serial_number)?;
    if inventory.iter().any(|ont| ont.serial_number == serial_number) {
        return Err(EngineError::AlreadyRegistered { serial: serial_number });
    }
    if input.bindings.is_empty() {
        return Err(EngineError::MalformedList {
            list: "GEM port",
            token: String::new(),
        });
    }
    let description = checked_description(input.description)?;

    let pools = AddressPools::from_records(inventory);
    let ont_id = pools.allocate(input.address, input.mode, device.pon_technology.ont_id_ceiling())?;

    Ok(RegistrationRequest {
        device_id: device.id.clone(),
        address: input.address,
        ont_id,
        serial_number,
        bindings: input.bindings,
        description,
        registration_code: render_registration_code(&device.registration_rule, input.address, ont_id),
    })
}

pub fn checked_serial(raw: &str) -> EngineResult<String> {
    let serial = normalize_serial(raw);
    if is_valid_serial(&serial) {
        Ok(serial)
    } else {
        Err(EngineError::InvalidSerial(raw.to_string()))
    }
}

/// Trim, drop if blank, and enforce the length limit
pub fn checked_description(raw: Option<String>) -> EngineResult<Option<String>> {
    let Some(description) = raw.map(|d| d.trim().to_string()).filter(|d| !d.is_empty()) else {
        return Ok(None);
    };
    let len = description.chars().count();
    if len > MAX_DESCRIPTION_LEN {
        return Err(EngineError::DescriptionTooLong {
            len,
            max: MAX_DESCRIPTION_LEN,
        });
    }
    Ok(Some(description))
}

/// Substitute (F), (B), (P) and (O) in a rule such as "0-(B)-(P)-(O)"
pub fn render_registration_code(rule: &str, address: TopologyAddress, ont_id: u32) -> String {
    rule.replace("(F)", &address.frame.to_string())
        .replace("(B)", &address.board.to_string())
        .replace("(P)", &address.port.to_string())
        .replace("(O)", &ont_id.to_string())
}
