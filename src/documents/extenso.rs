//! Numbers and currency written out in Brazilian Portuguese ("por extenso").

const UNIDADES: [&str; 20] = [
    "zero", "um", "dois", "três", "quatro", "cinco", "seis", "sete", "oito", "nove", "dez",
    "onze", "doze", "treze", "catorze", "quinze", "dezesseis", "dezessete", "dezoito", "dezenove",
];

const DEZENAS: [&str; 10] = [
    "", "", "vinte", "trinta", "quarenta", "cinquenta", "sessenta", "setenta", "oitenta", "noventa",
];

const CENTENAS: [&str; 10] = [
    "", "cento", "duzentos", "trezentos", "quatrocentos", "quinhentos", "seiscentos", "setecentos",
    "oitocentos", "novecentos",
];

/// (singular, plural) for each power of one thousand above "mil".
const ESCALAS: [(&str, &str); 5] = [
    ("milhão", "milhões"),
    ("bilhão", "bilhões"),
    ("trilhão", "trilhões"),
    ("quatrilhão", "quatrilhões"),
    ("quintilhão", "quintilhões"),
];

fn below_thousand(n: u64) -> String {
    if n == 100 {
        return "cem".to_string();
    }

    let mut parts: Vec<String> = Vec::new();
    let hundreds = (n / 100) as usize;
    let rest = (n % 100) as usize;

    if hundreds > 0 {
        parts.push(CENTENAS[hundreds].to_string());
    }
    if rest > 0 {
        if rest < 20 {
            parts.push(UNIDADES[rest].to_string());
        } else {
            let tens = DEZENAS[rest / 10];
            match rest % 10 {
                0 => parts.push(tens.to_string()),
                units => parts.push(format!("{} e {}", tens, UNIDADES[units])),
            }
        }
    }
    parts.join(" e ")
}

fn group_words(value: u64, scale: usize) -> String {
    match scale {
        0 => below_thousand(value),
        1 if value == 1 => "mil".to_string(),
        1 => format!("{} mil", below_thousand(value)),
        _ => {
            let (singular, plural) = ESCALAS[scale - 2];
            if value == 1 {
                format!("um {singular}")
            } else {
                format!("{} {}", below_thousand(value), plural)
            }
        }
    }
}

/// Cardinal number in words: `1234` → "mil duzentos e trinta e quatro".
pub fn number_words(n: u64) -> String {
    if n == 0 {
        return UNIDADES[0].to_string();
    }

    let mut groups = Vec::new();
    let mut rest = n;
    while rest > 0 {
        groups.push(rest % 1000);
        rest /= 1000;
    }

    // (scale, value) from most to least significant, zero groups skipped.
    let present: Vec<(usize, u64)> = groups
        .iter()
        .enumerate()
        .rev()
        .filter(|(_, value)| **value > 0)
        .map(|(scale, value)| (scale, *value))
        .collect();

    let mut out = String::new();
    for (i, &(scale, value)) in present.iter().enumerate() {
        if i > 0 {
            let last = i + 1 == present.len();
            if last && (value < 100 || value % 100 == 0) {
                out.push_str(" e ");
            } else {
                out.push(' ');
            }
        }
        out.push_str(&group_words(value, scale));
    }
    out
}

/// Amount in reais and centavos: `2.5` → "dois reais e cinquenta centavos".
pub fn currency_words(value: f64) -> String {
    let cents = (value.abs() * 100.0).round() as u64;
    let reais = cents / 100;
    let centavos = cents % 100;

    let reais_part = match reais {
        0 => None,
        1 => Some("um real".to_string()),
        n if n >= 1_000_000 && n % 1_000_000 == 0 => Some(format!("{} de reais", number_words(n))),
        n => Some(format!("{} reais", number_words(n))),
    };
    let centavos_part = match centavos {
        0 => None,
        1 => Some("um centavo".to_string()),
        n => Some(format!("{} centavos", number_words(n))),
    };

    match (reais_part, centavos_part) {
        (Some(r), Some(c)) => format!("{r} e {c}"),
        (Some(r), None) => r,
        (None, Some(c)) => c,
        (None, None) => "zero reais".to_string(),
    }
}

/// Integer part only, as used for the contract amounts: `1500.75` →
/// "mil e quinhentos reais".
pub fn whole_currency_words(value: f64) -> String {
    currency_words(value.trunc())
}
