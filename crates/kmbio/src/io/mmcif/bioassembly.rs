//! Biological assemblies from `_pdbx_struct_assembly_gen` and `_pdbx_struct_oper_list`.

use super::dict::MmcifDict;
use crate::io::error::Error;
use crate::model::header::{AssemblyOperation, Bioassembly, Biomt};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

const FORMAT: &str = "mmCIF";

const OPER_LIST_ITEMS: [&str; 13] = [
    "_pdbx_struct_oper_list.id",
    "_pdbx_struct_oper_list.matrix[1][1]",
    "_pdbx_struct_oper_list.matrix[1][2]",
    "_pdbx_struct_oper_list.matrix[1][3]",
    "_pdbx_struct_oper_list.vector[1]",
    "_pdbx_struct_oper_list.matrix[2][1]",
    "_pdbx_struct_oper_list.matrix[2][2]",
    "_pdbx_struct_oper_list.matrix[2][3]",
    "_pdbx_struct_oper_list.vector[2]",
    "_pdbx_struct_oper_list.matrix[3][1]",
    "_pdbx_struct_oper_list.matrix[3][2]",
    "_pdbx_struct_oper_list.matrix[3][3]",
    "_pdbx_struct_oper_list.vector[3]",
];

/// Reads every assembly defined in `dict`, keyed by assembly id.
///
/// Each `_pdbx_struct_assembly_gen` row becomes one [`AssemblyOperation`]. With
/// `use_auth_id` the `asym_id_list` (label chain ids) is translated to author chain ids
/// through `_atom_site`, dropping duplicates while keeping first-seen order. A file
/// without assembly tables yields an empty map.
pub fn get_mmcif_bioassembly_data(
    dict: &MmcifDict,
    use_auth_id: bool,
) -> Result<BTreeMap<String, Bioassembly>, Error> {
    let mut assemblies = BTreeMap::new();
    if !dict.contains_key("_pdbx_struct_assembly_gen.assembly_id") {
        return Ok(assemblies);
    }

    let operators = read_operators(dict)?;
    let chain_map = if use_auth_id {
        Some(label_to_auth_chains(dict)?)
    } else {
        None
    };

    let [assembly_ids, expressions, asym_lists] = dict.columns([
        "_pdbx_struct_assembly_gen.assembly_id",
        "_pdbx_struct_assembly_gen.oper_expression",
        "_pdbx_struct_assembly_gen.asym_id_list",
    ])?;

    for ((assembly_id, expression), asym_list) in
        assembly_ids.iter().zip(expressions).zip(asym_lists)
    {
        let mut chains: Vec<String> = Vec::new();
        for label in asym_list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let chain = match &chain_map {
                Some(map) => match map.get(label) {
                    Some(auth) => auth.clone(),
                    None => {
                        debug!(asym_id = label, "asym id has no atoms; skipped");
                        continue;
                    }
                },
                None => label.to_string(),
            };
            if !chains.contains(&chain) {
                chains.push(chain);
            }
        }

        let transforms = parse_oper_expression(expression)?
            .iter()
            .map(|product| compose_product(product, &operators))
            .collect::<Result<Vec<_>, _>>()?;

        assemblies
            .entry(assembly_id.clone())
            .or_insert_with(|| Bioassembly::new(assembly_id.clone()))
            .operations
            .push(AssemblyOperation { chains, transforms });
    }

    Ok(assemblies)
}

/// Expands an `oper_expression` into operator-id products.
///
/// `1`, `1,2`, `1-4` and `(1-4)` give one id per product; `(1,2)(3-5)` gives the
/// Cartesian product `[1,3] [1,4] ... [2,5]`, each applied right to left.
///
/// # Examples
///
/// ```
/// use kmbio::io::mmcif::bioassembly::parse_oper_expression;
///
/// assert_eq!(
///     parse_oper_expression("(1-2)(X0)").unwrap(),
///     vec![vec!["1", "X0"], vec!["2", "X0"]]
/// );
/// ```
pub fn parse_oper_expression(expression: &str) -> Result<Vec<Vec<String>>, Error> {
    let expression: String = expression.chars().filter(|c| !c.is_whitespace()).collect();
    let groups: Vec<&str> = if expression.contains('(') {
        let mut groups = Vec::new();
        let mut rest = expression.as_str();
        while !rest.is_empty() {
            let inner = rest
                .strip_prefix('(')
                .and_then(|r| r.split_once(')'))
                .ok_or_else(|| invalid_expression(&expression))?;
            groups.push(inner.0);
            rest = inner.1;
        }
        groups
    } else {
        vec![expression.as_str()]
    };

    let mut products: Vec<Vec<String>> = vec![Vec::new()];
    for group in groups {
        let ids = expand_group(group).ok_or_else(|| invalid_expression(&expression))?;
        products = products
            .into_iter()
            .flat_map(|prefix| {
                ids.iter().map(move |id| {
                    let mut product = prefix.clone();
                    product.push(id.clone());
                    product
                })
            })
            .collect();
    }
    Ok(products)
}

/// `1,3-5,P` → `["1", "3", "4", "5", "P"]`.
fn expand_group(group: &str) -> Option<Vec<String>> {
    let mut ids = Vec::new();
    for item in group.split(',') {
        if item.is_empty() {
            return None;
        }
        match item.split_once('-') {
            Some((start, end)) => {
                let start: i64 = start.parse().ok()?;
                let end: i64 = end.parse().ok()?;
                if end < start {
                    return None;
                }
                ids.extend((start..=end).map(|i| i.to_string()));
            }
            None => ids.push(item.to_string()),
        }
    }
    Some(ids)
}

fn invalid_expression(expression: &str) -> Error {
    Error::inconsistent_data(
        FORMAT,
        None,
        format!("invalid oper_expression '{expression}'"),
    )
}

/// Composes a product right to left: `[a, b]` applies `b` first, then `a`.
fn compose_product(product: &[String], operators: &HashMap<String, Biomt>) -> Result<Biomt, Error> {
    product.iter().try_fold(Biomt::identity(), |acc, id| {
        let operator = operators.get(id).ok_or_else(|| {
            Error::inconsistent_data(FORMAT, None, format!("undefined operator '{id}'"))
        })?;
        Ok(acc.compose(operator))
    })
}

fn read_operators(dict: &MmcifDict) -> Result<HashMap<String, Biomt>, Error> {
    let columns = dict.columns(OPER_LIST_ITEMS)?;
    let rows = columns[0].len();
    let mut operators = HashMap::with_capacity(rows);

    for row in 0..rows {
        let mut values = [0.0; 12];
        for (value, (column, item)) in values
            .iter_mut()
            .zip(columns[1..].iter().zip(&OPER_LIST_ITEMS[1..]))
        {
            let text = &column[row];
            *value = text.parse::<f64>().map_err(|_| {
                Error::inconsistent_data(FORMAT, None, format!("invalid {item} value '{text}'"))
            })?;
        }
        let biomt = Biomt {
            rotation: [
                [values[0], values[1], values[2]],
                [values[4], values[5], values[6]],
                [values[8], values[9], values[10]],
            ],
            translation: [values[3], values[7], values[11]],
        };
        operators.insert(columns[0][row].clone(), biomt);
    }
    Ok(operators)
}

/// First author chain id seen for each label asym id in `_atom_site`.
fn label_to_auth_chains(dict: &MmcifDict) -> Result<HashMap<String, String>, Error> {
    let [labels, auths] = dict.columns(["_atom_site.label_asym_id", "_atom_site.auth_asym_id"])?;
    let mut map = HashMap::new();
    for (label, auth) in labels.iter().zip(auths) {
        map.entry(label.clone()).or_insert_with(|| auth.clone());
    }
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ASSEMBLY_CIF: &str = "\
data_TEST
loop_
_pdbx_struct_assembly_gen.assembly_id
_pdbx_struct_assembly_gen.oper_expression
_pdbx_struct_assembly_gen.asym_id_list
1 1   A,C,B
2 '(1-2)(3)' B
#
loop_
_pdbx_struct_oper_list.id
_pdbx_struct_oper_list.type
_pdbx_struct_oper_list.matrix[1][1]
_pdbx_struct_oper_list.matrix[1][2]
_pdbx_struct_oper_list.matrix[1][3]
_pdbx_struct_oper_list.vector[1]
_pdbx_struct_oper_list.matrix[2][1]
_pdbx_struct_oper_list.matrix[2][2]
_pdbx_struct_oper_list.matrix[2][3]
_pdbx_struct_oper_list.vector[2]
_pdbx_struct_oper_list.matrix[3][1]
_pdbx_struct_oper_list.matrix[3][2]
_pdbx_struct_oper_list.matrix[3][3]
_pdbx_struct_oper_list.vector[3]
1 'identity operation'         1.0 0.0 0.0 0.0   0.0 1.0 0.0 0.0   0.0 0.0 1.0 0.0
2 'crystal symmetry operation' -1.0 0.0 0.0 10.0 0.0 -1.0 0.0 0.0  0.0 0.0 1.0 0.0
3 'crystal symmetry operation' 0.0 -1.0 0.0 0.0  1.0 0.0 0.0 0.0   0.0 0.0 1.0 5.0
#
loop_
_atom_site.label_asym_id
_atom_site.auth_asym_id
A A
B B
C A
";

    #[test]
    fn expands_expression_forms() {
        assert_eq!(parse_oper_expression("1").unwrap(), vec![vec!["1"]]);
        assert_eq!(
            parse_oper_expression("1,2").unwrap(),
            vec![vec!["1"], vec!["2"]]
        );
        assert_eq!(parse_oper_expression("(1-3)").unwrap().len(), 3);
        assert_eq!(
            parse_oper_expression("(1,2)(3-4)").unwrap(),
            vec![
                vec!["1", "3"],
                vec!["1", "4"],
                vec!["2", "3"],
                vec!["2", "4"]
            ]
        );
    }

    #[test]
    fn rejects_malformed_expressions() {
        assert!(parse_oper_expression("(1-2").is_err());
        assert!(parse_oper_expression("3-1").is_err());
        assert!(parse_oper_expression("1,,2").is_err());
        assert!(parse_oper_expression("1)(2").is_err());
    }

    #[test]
    fn maps_label_chains_to_author_chains() {
        let dict = MmcifDict::from_reader(ASSEMBLY_CIF.as_bytes()).unwrap();
        let data = get_mmcif_bioassembly_data(&dict, true).unwrap();

        assert_eq!(data["1"].operations[0].chains, vec!["A", "B"]);
        assert!(data["1"].operations[0].transforms[0].is_identity(0.0));

        let labels = get_mmcif_bioassembly_data(&dict, false).unwrap();
        assert_eq!(labels["1"].operations[0].chains, vec!["A", "C", "B"]);
    }

    #[test]
    fn products_apply_right_operator_first() {
        let dict = MmcifDict::from_reader(ASSEMBLY_CIF.as_bytes()).unwrap();
        let data = get_mmcif_bioassembly_data(&dict, true).unwrap();
        let transforms = &data["2"].operations[0].transforms;
        assert_eq!(transforms.len(), 2);

        // Operator 3 maps (1,0,0) to (0,1,5); operator 2 then gives (10,-1,5).
        let second = transforms[1];
        let moved = second.rotation_matrix() * nalgebra::Vector3::new(1.0, 0.0, 0.0)
            + second.translation_vector();
        assert!((moved - nalgebra::Vector3::new(10.0, -1.0, 5.0)).norm() < 1e-12);
    }

    #[test]
    fn missing_tables_mean_no_assemblies() {
        let dict = MmcifDict::from_reader("data_X\n_entry.id X\n".as_bytes()).unwrap();
        assert!(get_mmcif_bioassembly_data(&dict, true).unwrap().is_empty());
    }

    #[test]
    fn undefined_operator_is_an_error() {
        let cif = ASSEMBLY_CIF.replace("'(1-2)(3)'", "'(1-2)(9)'");
        let dict = MmcifDict::from_reader(cif.as_bytes()).unwrap();
        assert!(get_mmcif_bioassembly_data(&dict, true).is_err());
    }
}
