use super::{Database, DatabaseError};
use itertools::Itertools;
use rand::Rng;
use tracing::{debug, info};
use tracing_unwrap::OptionExt;
use uuid::Uuid;

/// Fill both table pairs with `total` parents and 1-3 children each.
/// Row values are drawn from `rng` so tests can seed the distribution;
/// the run itself uses an unseeded thread rng.
pub fn populate<R: Rng>(
    db: &mut Database,
    total: usize,
    batch_size: usize,
    rng: &mut R,
) -> Result<(), DatabaseError> {
    info!(records = total, variant = "serial", "Populating tables");
    populate_serial(db, total, batch_size, rng)?;

    info!(records = total, variant = "uuid", "Populating tables");
    populate_uuid(db, total, batch_size, rng)?;

    Ok(())
}

fn populate_serial<R: Rng>(
    db: &mut Database,
    total: usize,
    batch_size: usize,
    rng: &mut R,
) -> Result<(), DatabaseError> {
    // parent ids are the loop index; the table's own sequence stays untouched
    let mut inserted = 0;
    for batch in &(1..=total).chunks(batch_size) {
        let rows = batch
            .map(|i| serial_parent_row(i, random_value(rng)))
            .collect_vec();
        inserted += rows.len();
        insert_values(db, "parent_serial", "id, name, value", &rows)?;
        debug!(table = "parent_serial", inserted, "Inserted batch");
    }
    info!(table = "parent_serial", rows = inserted, "Population done");

    // child ids come from the sequence, which is reset explicitly first;
    // the parent table deliberately keeps its default sequence state
    db.query("SELECT setval('child_serial_id_seq', 1, false)", &[])?;

    let mut inserted = 0;
    for batch in &(1..=total).chunks(batch_size) {
        let rows = batch
            .flat_map(|parent| {
                let count = child_count(rng);
                (0..count)
                    .map(|_| serial_child_row(parent, rng.gen_bool(0.5)))
                    .collect_vec()
            })
            .collect_vec();
        inserted += rows.len();
        insert_values(db, "child_serial", "id, parent_id, description, active", &rows)?;
        debug!(table = "child_serial", inserted, "Inserted batch");
    }
    info!(table = "child_serial", rows = inserted, "Population done");

    Ok(())
}

fn populate_uuid<R: Rng>(
    db: &mut Database,
    total: usize,
    batch_size: usize,
    rng: &mut R,
) -> Result<(), DatabaseError> {
    // parent ids are drawn from the server side generator before insertion
    let mut parent_ids = Vec::with_capacity(total);
    while parent_ids.len() < total {
        let n = batch_size.min(total - parent_ids.len());
        let ids = fetch_generated_ids(db, n)?;

        let rows = ids
            .iter()
            .enumerate()
            .map(|(offset, id)| {
                uuid_parent_row(id, parent_ids.len() + offset + 1, random_value(rng))
            })
            .collect_vec();
        insert_values(db, "parent_uuid", "id, name, value", &rows)?;

        parent_ids.extend(ids);
        debug!(table = "parent_uuid", inserted = parent_ids.len(), "Inserted batch");
    }
    info!(table = "parent_uuid", rows = parent_ids.len(), "Population done");

    let mut inserted = 0;
    for batch in &parent_ids.iter().enumerate().chunks(batch_size) {
        // draw the child counts up front so the batch's ids can be fetched
        // from the generator in a single round trip
        let wanted = batch
            .map(|(position, parent)| (position, parent, child_count(rng)))
            .collect_vec();
        let needed = wanted.iter().map(|(_, _, count)| count).sum();

        let mut ids = fetch_generated_ids(db, needed)?.into_iter();
        let mut rows = Vec::with_capacity(needed);
        for (position, parent, count) in wanted {
            for _ in 0..count {
                let id = ids.next().expect_or_log("generator returned too few ids");
                rows.push(uuid_child_row(&id, parent, position, rng.gen_bool(0.5)));
            }
        }

        inserted += rows.len();
        insert_values(db, "child_uuid", "id, parent_id, description, active", &rows)?;
        debug!(table = "child_uuid", inserted, "Inserted batch");
    }
    info!(table = "child_uuid", rows = inserted, "Population done");

    Ok(())
}

/// Draw `n` identifiers from the probed generator function in one round trip.
fn fetch_generated_ids(db: &mut Database, n: usize) -> Result<Vec<Uuid>, DatabaseError> {
    let sql = format!(
        "SELECT {} FROM generate_series(1, $1)",
        db.generator().sql()
    );
    let rows = db.query(&sql, &[&(n as i32)])?;

    Ok(rows.iter().map(|row| row.get(0)).collect())
}

fn insert_values(
    db: &mut Database,
    table: &str,
    columns: &str,
    rows: &[String],
) -> Result<(), DatabaseError> {
    if rows.is_empty() {
        return Ok(());
    }

    db.batch_execute(&format!(
        "INSERT INTO {table} ({columns}) VALUES {}",
        rows.iter().join(",")
    ))
}

fn random_value<R: Rng>(rng: &mut R) -> i32 {
    rng.gen_range(0..1000)
}

fn child_count<R: Rng>(rng: &mut R) -> usize {
    rng.gen_range(1..=3)
}

fn serial_parent_row(id: usize, value: i32) -> String {
    format!("({id}, 'Name {id}', {value})")
}

fn serial_child_row(parent: usize, active: bool) -> String {
    format!("(nextval('child_serial_id_seq'), {parent}, 'Description for {parent}', {active})")
}

fn uuid_parent_row(id: &Uuid, position: usize, value: i32) -> String {
    format!("('{id}', 'Name UUID {position}', {value})")
}

fn uuid_child_row(id: &Uuid, parent: &Uuid, position: usize, active: bool) -> String {
    format!("('{id}', '{parent}', 'Description UUID for {position}', {active})")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn child_counts_stay_in_documented_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let counts = (0..1000).map(|_| child_count(&mut rng)).collect_vec();

        assert!(counts.iter().all(|count| (1..=3).contains(count)));
        // uniform over three values, a thousand draws hits each of them
        for expected in 1..=3 {
            assert!(counts.contains(&expected));
        }
    }

    #[test]
    fn values_stay_in_documented_range() {
        let mut rng = StdRng::seed_from_u64(7);

        assert!((0..1000).all(|_| (0..1000).contains(&random_value(&mut rng))));
    }

    #[test]
    fn serial_rows_embed_the_loop_index() {
        assert_eq!(serial_parent_row(42, 7), "(42, 'Name 42', 7)");
        assert_eq!(
            serial_child_row(42, true),
            "(nextval('child_serial_id_seq'), 42, 'Description for 42', true)"
        );
    }

    #[test]
    fn uuid_rows_embed_generated_identifiers() {
        let parent = Uuid::nil();
        let child = Uuid::max();

        let parent_row = uuid_parent_row(&parent, 3, 500);
        assert!(parent_row.starts_with(&format!("('{parent}', 'Name UUID 3'")));

        let child_row = uuid_child_row(&child, &parent, 3, false);
        assert!(child_row.contains(&format!("'{parent}'")));
        assert!(child_row.ends_with("false)"));
    }
}
