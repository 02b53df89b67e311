//! The bundled Mexico City attribute tables parse and cover what they claim

use geotally_core::attributes::AttributeTable;

#[test]
fn test_borough_table() {
    let table = AttributeTable::from_toml_str(include_str!("../../../data/cdmx_alcaldias.toml")).unwrap();

    assert_eq!(table.len(), 16);
    assert_eq!(table.get("Iztapalapa").unwrap().total_votes, 1_200_000);
    assert_eq!(table.get("benito juarez").unwrap().winning_party, "PAN");
    assert!(table.get("TLALPAN").unwrap().turnout.is_none());

    // Official boundary names resolve to the same records
    for name in [
        "Benito Juárez",
        "Cuajimalpa de Morelos",
        "Gustavo A. Madero",
        "La Magdalena Contreras",
        "Tláhuac",
    ] {
        assert!(table.get(name).is_some(), "{name} did not resolve");
    }
}

#[test]
fn test_district_table() {
    let table = AttributeTable::from_toml_str(include_str!("../../../data/cdmx_distritos.toml")).unwrap();

    assert_eq!(table.len(), 24);
    let district = table.get("DISTRITO_22").unwrap();
    assert_eq!(district.parent.as_deref(), Some("CUAJIMALPA"));
    assert_eq!(district.turnout, Some(68.4));
    // Shares are not published per district
    assert_eq!(district.vote_share, 0.0);
}
