//! Build reason propagation
//!
//! Decides the final set of units to build. External references are resolved
//! first, since a unit whose build inputs cannot be found must not build at
//! all. Then each unit gets its own checks, and finally every unit with a
//! dependency that will be rebuilt is marked too.

use crate::core::mode::BuildMode;
use crate::core::unit::{reason, UnitId, UnitTable};
use crate::core::unit_list::UnitList;
use crate::error::{DiscoveryError, ResolverError};

/// Resolve every unit's external references against its direct dependencies
///
/// Fails naming every unit with an unresolvable reference. Afterwards, units
/// without a build reason whose exported products are missing on disk are
/// marked for rebuild.
pub fn resolve_external_references(units: &mut UnitTable) -> Result<(), DiscoveryError> {
    let ids: Vec<UnitId> = units.ids().collect();
    let mut failures = Vec::new();
    for id in ids {
        if !resolve_unit_externals(units, id) {
            failures.push(units[id].to_string());
        }
    }
    if !failures.is_empty() {
        return Err(DiscoveryError::UnresolvedExternals { failures });
    }

    check_exported_products(units);
    Ok(())
}

fn resolve_unit_externals(units: &mut UnitTable, id: UnitId) -> bool {
    let references = units[id].external_references().to_vec();
    let requester = units[id].name().to_string();
    let mut resolved_all = true;

    for reference in references {
        let owner = units[id]
            .direct_dependencies()
            .iter()
            .copied()
            .find(|&dep| units[dep].name() == reference.module);
        let Some(owner) = owner else {
            tracing::error!(
                "{}: can't find module '{}' to resolve a dependency on {}",
                units[id],
                reference.module,
                reference.path
            );
            resolved_all = false;
            continue;
        };

        let product = match units[owner]
            .maker_mut()
            .resolve_exported_resource(&requester, &reference.path)
        {
            Ok(Some(product)) => product,
            Ok(None) => {
                tracing::error!(
                    "{}: can't find exported resource {} in module '{}'",
                    units[id],
                    reference.path,
                    reference.module
                );
                resolved_all = false;
                continue;
            }
            Err(e) => {
                tracing::error!("{}: {}", units[id], e);
                resolved_all = false;
                continue;
            }
        };
        tracing::debug!("{}: {} is {}", units[id], reference, product.file.display());
        if let Err(e) = units[id].maker_mut().add_resolved_external(&reference, product) {
            tracing::error!("{}: {}", units[id], e);
            resolved_all = false;
        }
    }
    resolved_all
}

/// Mark units whose previously built exports have gone missing
///
/// A unit that is not rebuilt hands its old exported products to its
/// dependents, so they must still exist.
pub fn check_exported_products(units: &mut UnitTable) {
    let ids: Vec<UnitId> = units.ids().collect();
    for id in ids {
        let unit = &mut units[id];
        if unit.build_reason().is_some() {
            continue;
        }
        let missing: Vec<String> = unit
            .maker()
            .exported_products()
            .into_iter()
            .filter(|p| !p.file.exists())
            .map(|p| p.name)
            .collect();
        if !missing.is_empty() {
            tracing::warn!("{}: missing exported products {}", unit, missing.join(", "));
            unit.set_build_reason(format!("Unexpected missing external: {}", missing.join(", ")));
        }
    }
}

/// Decide which units of the build order must be built
///
/// In clean mode every unit builds. Otherwise units without a reason ask
/// their maker, and then any unit with a dependency that will be rebuilt is
/// marked until nothing changes.
pub fn determine_units_to_build(
    units: &mut UnitTable,
    order: &UnitList,
    mode: BuildMode,
) -> Result<(), ResolverError> {
    for id in order {
        check_unit(units, id, mode);
    }

    loop {
        let mut marked = false;
        for id in order {
            if units[id].build_reason().is_some() {
                continue;
            }
            let trigger = units[id]
                .full_dependencies()
                .ok_or_else(|| ResolverError::Unresolved {
                    module: units[id].name().to_string(),
                })?
                .iter()
                .find(|&dep| units[dep].build_reason().is_some());
            if let Some(dep) = trigger {
                tracing::debug!("{} will be rebuilt because {} will be", units[id], units[dep]);
                units[id].set_build_reason(reason::DEPENDENCY_REBUILT);
                marked = true;
            }
        }
        if !marked {
            break;
        }
    }

    tracing::info!(
        "{} of {} modules must be built",
        units.compilation_count(order),
        order.len()
    );
    Ok(())
}

fn check_unit(units: &mut UnitTable, id: UnitId, mode: BuildMode) {
    let unit = &mut units[id];
    if mode == BuildMode::Clean {
        unit.set_build_reason(reason::CLEAN_REQUESTED);
        return;
    }
    if unit.build_reason().is_some() {
        return;
    }
    if let Some(why) = unit.maker().must_be_built() {
        unit.set_build_reason(why);
    }
}
