#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WeaponType {
    Firearm,
    Explosive,
    Vehicle,
    Melee,
    Other,
}

impl WeaponType {
    pub fn from_weapon(weapon: &str) -> Self {
        if weapon.starts_with("BP_Firearm_") {
            WeaponType::Firearm
        } else if weapon.starts_with("BP_Projectile_") || weapon.starts_with("BP_Explosive_") {
            WeaponType::Explosive
        } else if weapon.starts_with("BP_Vehicle") {
            WeaponType::Vehicle
        } else if weapon.starts_with("BP_Melee_") {
            WeaponType::Melee
        } else {
            WeaponType::Other
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            WeaponType::Firearm => "firearm",
            WeaponType::Explosive => "explosive",
            WeaponType::Vehicle => "vehicle",
            WeaponType::Melee => "melee",
            WeaponType::Other => "other",
        }
    }
}

/// Strips the blueprint instance suffix: `BP_Firearm_M4A1_C_2147480587` -> `BP_Firearm_M4A1`.
pub fn normalize_weapon(raw: &str) -> &str {
    match raw.rfind("_C_") {
        Some(idx) if raw[idx + 3..].chars().all(|c| c.is_ascii_digit()) => &raw[..idx],
        _ => raw.strip_suffix("_C").unwrap_or(raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_instance_suffix() {
        assert_eq!(normalize_weapon("BP_Firearm_M4A1_C_2147480587"), "BP_Firearm_M4A1");
        assert_eq!(normalize_weapon("BP_Projectile_Molotov_C"), "BP_Projectile_Molotov");
        assert_eq!(normalize_weapon("Weapon_X"), "Weapon_X");
    }

    #[test]
    fn derives_type_tag() {
        assert_eq!(WeaponType::from_weapon("BP_Firearm_AKM"), WeaponType::Firearm);
        assert_eq!(WeaponType::from_weapon("BP_Projectile_GP25"), WeaponType::Explosive);
        assert_eq!(WeaponType::from_weapon("BP_Vehicle_Technical"), WeaponType::Vehicle);
        assert_eq!(WeaponType::from_weapon("Weapon_X"), WeaponType::Other);
    }
}
