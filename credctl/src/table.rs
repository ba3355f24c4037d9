//! Tables describing objects we've created.

use credctl_common::prelude::*;
use prettytable::{cell, format::consts::FORMAT_CLEAN, row, Table};

/// Print the name and type of `secret` as a two-row table, one field per row.
pub fn print_secret_table<W: Write + ?Sized>(secret: &Secret, out: &mut W) -> Result<()> {
    let mut table = Table::new();
    table.set_format(*FORMAT_CLEAN);
    table.add_row(row!["Name", secret.display_name()]);
    table.add_row(row!["Type", &secret.secret_type]);
    table.print(out).context("error printing secret table")?;
    Ok(())
}

#[test]
fn prints_name_and_type() {
    use credctl_common::{kind::SecretTarget, secret::SECRET_TYPE_BASIC_AUTH};

    let target = SecretTarget {
        name: "secret1".to_owned(),
        namespace: "ns1".to_owned(),
        generate_name: false,
    };
    let secret = Secret::new(SECRET_TYPE_BASIC_AUTH, &target);

    let mut out = vec![];
    print_secret_table(&secret, &mut out).unwrap();
    let out = String::from_utf8(out).unwrap();
    let lines = out.lines().map(str::trim).collect::<Vec<_>>();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].starts_with("Name"));
    assert!(lines[0].ends_with("secret1"));
    assert!(lines[1].starts_with("Type"));
    assert!(lines[1].ends_with("kubernetes.io/basic-auth"));
}
