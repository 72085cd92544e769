use felica_cards::{
    operators, CardFamily, DateLayout, OperatorGroup, OperatorInfo, ServiceRule, REGISTRY,
};
use felica_common::code_hex;

/// List the registered card families
pub fn cmd_cards() {
    println!("Registered cards ({}):\n", REGISTRY.len());

    for card in REGISTRY {
        let family = match card.family {
            CardFamily::Suica(_) => "Suica layout",
            CardFamily::Rapica(_) => "RAPICA layout",
        };
        println!("{} [system code {}, {}]", card.name, code_hex(&card.system_code), family);

        for rule in card.rules {
            match rule {
                ServiceRule::Attribute(attribute) => println!(
                    "  attribute {}  {} date bytes",
                    code_hex(&attribute.service_code),
                    attribute.fields.byte_len()
                ),
                ServiceRule::History(history) => println!(
                    "  history   {}  {} blocks, {} date",
                    code_hex(&history.service_code),
                    history.block_count,
                    match history.date_layout {
                        DateLayout::BigEndian => "big-endian",
                        DateLayout::LittleEndian => "little-endian",
                    }
                ),
            }
        }
        println!();
    }

    println!("RAPICA operators:\n");
    for operator in operators() {
        println!("{}", format_operator(&operator));
    }
}

/// One operator table row: code, station layout, settlement label, name
fn format_operator(operator: &OperatorInfo) -> String {
    let group = match operator.group {
        OperatorGroup::Stop24 => "stop24",
        OperatorGroup::Route24 => "route24",
    };
    let settlement = operator
        .settlement
        .map_or_else(|| "-".to_string(), |kind| kind.to_string());

    format!(
        "  {:02X}  {:<8} {:<6} {}",
        operator.code,
        group,
        settlement,
        operator.name.unwrap_or("(unnamed)")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use felica_cards::operator_info;

    #[test]
    fn test_format_operator_row() {
        assert_eq!(format_operator(&operator_info(0x01)), "  01  stop24   tram   City tram");
        assert_eq!(
            format_operator(&operator_info(0x12)),
            "  12  route24  bus    Private bus (coastal)"
        );
    }

    #[test]
    fn test_format_unknown_operator_row() {
        assert_eq!(
            format_operator(&OperatorInfo::unknown(0xEE)),
            "  EE  route24  -      (unnamed)"
        );
    }
}
