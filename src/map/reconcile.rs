use crate::map::geometry::GeometrySet;
use crate::progress::TrailTable;
use tracing::debug;
use tracing::warn;

/// Partition of the spreadsheet identifiers against the geometry source.
///
/// Every spreadsheet identifier lands in exactly one of `direct`, `alternate` or
/// `without_geometry`. `to_draw` lists the primary identifiers whose geometry received
/// attributes, once each, in discovery order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Reconciliation {
    pub to_draw: Vec<String>,
    /// Identifiers equal to a primary geometry identifier
    pub direct: Vec<String>,
    /// (spreadsheet identifier, primary identifier) pairs resolved through an alternate
    pub alternate: Vec<(String, String)>,
    pub without_geometry: Vec<String>,
}

impl Reconciliation {
    fn push_to_draw(&mut self, trail_id: &str) {
        if !self.to_draw.iter().any(|id| id == trail_id) {
            self.to_draw.push(trail_id.to_owned());
        }
    }
}

/// Attaches spreadsheet attributes to geometry records.
///
/// A direct match on the primary identifier is tried first, then the alternate table.
/// Identifiers matching neither are collected for the report, which is not an error.
/// When two identifiers reach the same record, the later one's attributes stay.
pub fn reconcile(table: &TrailTable, geometry: &mut GeometrySet) -> Reconciliation {
    let mut reconciliation = Reconciliation::default();
    for (trail_id, attributes) in table.iter() {
        if let Some(record) = geometry.get_mut(trail_id) {
            record.attributes = Some(attributes.clone());
            reconciliation.direct.push(trail_id.to_owned());
            reconciliation.push_to_draw(trail_id);
            continue;
        }

        let primary = geometry.resolve_alternate(trail_id).map(str::to_owned);
        match primary.and_then(|primary| geometry.get_mut(&primary).map(|record| (primary, record))) {
            Some((primary, record)) => {
                record.attributes = Some(attributes.clone());
                debug!(trail_id, primary = %primary, "matched through alternate identifier");
                reconciliation.push_to_draw(&primary);
                reconciliation.alternate.push((trail_id.to_owned(), primary));
            }
            None => {
                warn!(trail_id, "no geometry for trail");
                reconciliation.without_geometry.push(trail_id.to_owned());
            }
        }
    }
    reconciliation
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::geometry::TrailGeometry;
    use crate::progress::TrailAttributes;
    use crate::spreadsheet::CellValue;

    fn attributes(mileage: f64, todo: f64) -> TrailAttributes {
        TrailAttributes {
            mileage: CellValue::Number(mileage),
            miles_todo: CellValue::Number(todo),
        }
    }

    fn geometry() -> GeometrySet {
        let mut geometry = GeometrySet::new();
        for (id, alt) in [
            ("Pemigewasset, Lincoln Woods Trail", None),
            ("Carter-Moriah, Rattle River Trail", Some("Carter-Moriah, Rattle River")),
            ("Carter-Moriah, Imp Trail", None),
        ] {
            geometry.insert(TrailGeometry::new(id, alt, vec![vec![(44.0, -71.0)]])).unwrap();
        }
        geometry
    }

    #[test]
    fn partitions_identifiers() {
        let mut table = TrailTable::new();
        table.insert("Pemigewasset, Lincoln Woods Trail".to_owned(), attributes(2.9, 0.0));
        table.insert("Carter-Moriah, Rattle River".to_owned(), attributes(4.3, 1.0));
        table.insert("Carter-Moriah, Stony Brook Trail".to_owned(), attributes(3.6, 3.6));
        let mut geometry = geometry();

        let result = reconcile(&table, &mut geometry);
        assert_eq!(result.direct, vec!["Pemigewasset, Lincoln Woods Trail"]);
        assert_eq!(
            result.alternate,
            vec![("Carter-Moriah, Rattle River".to_owned(), "Carter-Moriah, Rattle River Trail".to_owned())]
        );
        assert_eq!(result.without_geometry, vec!["Carter-Moriah, Stony Brook Trail"]);
        assert_eq!(result.to_draw, vec!["Pemigewasset, Lincoln Woods Trail", "Carter-Moriah, Rattle River Trail"]);

        let rattle = geometry.get("Carter-Moriah, Rattle River Trail").unwrap();
        assert_eq!(rattle.attributes, Some(attributes(4.3, 1.0)));
        assert_eq!(geometry.get("Carter-Moriah, Imp Trail").unwrap().attributes, None);
    }

    #[test]
    fn same_record_reached_twice_is_drawn_once() {
        let mut table = TrailTable::new();
        table.insert("Carter-Moriah, Rattle River Trail".to_owned(), attributes(4.3, 4.3));
        table.insert("Carter-Moriah, Rattle River".to_owned(), attributes(4.3, 0.0));
        let mut geometry = geometry();

        let result = reconcile(&table, &mut geometry);
        assert_eq!(result.to_draw, vec!["Carter-Moriah, Rattle River Trail"]);
        assert_eq!(result.direct.len() + result.alternate.len(), 2);
        let rattle = geometry.get("Carter-Moriah, Rattle River Trail").unwrap();
        assert!(rattle.attributes.as_ref().unwrap().is_traced());
    }

    #[test]
    fn empty_table_draws_nothing() {
        let result = reconcile(&TrailTable::new(), &mut geometry());
        assert_eq!(result, Reconciliation::default());
    }
}
