//! Additional symbols and kanji of the ARIB kanji set, rows 85, 86 and
//! 90 to 94.

const ROW_7A: [&str; 35] = [
    "[HV]", "[SD]", "[Ｐ]", "[Ｗ]", "[MV]", "[手]", "[字]", "[双]",
    "[デ]", "[Ｓ]", "[二]", "[多]", "[解]", "[SS]", "[Ｂ]", "[Ｎ]",
    "■", "●", "[天]", "[交]", "[映]", "[無]", "[料]", "[年齢制限]",
    "[前]", "[後]", "[再]", "[新]", "[初]", "[終]", "[生]", "[販]",
    "[声]", "[吹]", "[PPV]",
];

const ROW_7C: [&str; 91] = [
    "→", "←", "↑", "↓", "●", "○", "年", "月",
    "日", "円", "㎡", "㎥", "㎝", "㎠", "㎤", "０.",
    "１.", "２.", "３.", "４.", "５.", "６.", "７.", "８.",
    "９.", "氏", "副", "元", "故", "前", "[新]", "０,",
    "１,", "２,", "３,", "４,", "５,", "６,", "７,", "８,",
    "９,", "(社)", "(財)", "(有)", "(株)", "(代)", "(問)", "▶",
    "◀", "〖", "〗", "⟐", "^2", "^3", "(CD)", "(vn)",
    "(ob)", "(cb)", "(ce", "mb)", "(hp)", "(br)", "(p)", "(s)",
    "(ms)", "(t)", "(bs)", "(b)", "(tb)", "(tp)", "(ds)", "(ag)",
    "(eg)", "(vo)", "(fl)", "(ke", "y)", "(sa", "x)", "(sy",
    "n)", "(or", "g)", "(pe", "r)", "(R)", "(C)", "(箏)",
    "DJ", "[演]", "Fax",
];

const ROW_7D: [&str; 91] = [
    "㈪", "㈫", "㈬", "㈭", "㈮", "㈯", "㈰", "㈷",
    "㍾", "㍽", "㍼", "㍻", "№", "℡", "〶", "○",
    "〔本〕", "〔三〕", "〔二〕", "〔安〕", "〔点〕", "〔打〕", "〔盗〕", "〔勝〕",
    "〔敗〕", "〔Ｓ〕", "［投］", "［捕］", "［一］", "［二］", "［三］", "［遊］",
    "［左］", "［中］", "［右］", "［指］", "［走］", "［打］", "㍑", "㎏",
    "㎐", "ha", "㎞", "㎢", "㍱", "・", "・", "1/2",
    "0/3", "1/3", "2/3", "1/4", "3/4", "1/5", "2/5", "3/5",
    "4/5", "1/6", "5/6", "1/7", "1/8", "1/9", "1/10", "☀",
    "☁", "☂", "⛄", "☖", "☗", "▽", "▼", "♦",
    "♥", "♣", "♠", "⌺", "⦿", "‼", "⁉", "(曇/晴)",
    "☔", "(雨)", "(雪)", "(大雪)", "⚡", "(雷雨)", "⛈", "⚞",
    "⚟", "♬", "☎",
];

const ROW_7E: [&str; 93] = [
    "Ⅰ", "Ⅱ", "Ⅲ", "Ⅳ", "Ⅴ", "Ⅵ", "Ⅶ", "Ⅷ",
    "Ⅸ", "Ⅹ", "Ⅺ", "Ⅻ", "⑰", "⑱", "⑲", "⑳",
    "⑴", "⑵", "⑶", "⑷", "⑸", "⑹", "⑺", "⑻",
    "⑼", "⑽", "⑾", "⑿", "㉑", "㉒", "㉓", "㉔",
    "(A)", "(B)", "(C)", "(D)", "(E)", "(F)", "(G)", "(H)",
    "(I)", "(J)", "(K)", "(L)", "(M)", "(N)", "(O)", "(P)",
    "(Q)", "(R)", "(S)", "(T)", "(U)", "(V)", "(W)", "(X)",
    "(Y)", "(Z)", "㉕", "㉖", "㉗", "㉘", "㉙", "㉚",
    "①", "②", "③", "④", "⑤", "⑥", "⑦", "⑧",
    "⑨", "⑩", "⑪", "⑫", "⑬", "⑭", "⑮", "⑯",
    "❶", "❷", "❸", "❹", "❺", "❻", "❼", "❽",
    "❾", "❿", "⓫", "⓬", "㉛",
];

const ROW_75: [&str; 94] = [
    "㐂", "𠅘", "份", "仿", "侚", "俉", "傜", "儞",
    "冼", "㔟", "匇", "卡", "卬", "詹", "𠮷", "呍",
    "咖", "咜", "咩", "唎", "啊", "噲", "囤", "圳",
    "圴", "塚", "墀", "姤", "娣", "婕", "寬", "﨑",
    "㟢", "庬", "弴", "彅", "德", "怗", "恵", "愰",
    "昤", "曈", "曙", "曺", "曻", "桒", "鿄", "椑",
    "椻", "橅", "檑", "櫛", "𣏌", "𣏾", "𣗄", "毱",
    "泠", "洮", "海", "涿", "淊", "淸", "渚", "潞",
    "濹", "灤", "𤋮", "𤋮", "煇", "燁", "爀", "玟",
    "玨", "珉", "珖", "琛", "琡", "琢", "琦", "琪",
    "琬", "琹", "瑋", "㻚", "畵", "疁", "睲", "䂓",
    "磈", "磠", "祇", "禮", "鿆", "䄃",
];

const ROW_76: [&str; 43] = [
    "鿅", "秚", "稞", "筿", "簱", "䉤", "綋", "羡",
    "脘", "脺", "舘", "芮", "葛", "蓜", "蓬", "蕙",
    "藎", "蝕", "蟬", "蠋", "裵", "角", "諶", "跎",
    "辻", "迶", "郝", "鄧", "鄭", "醲", "鈳", "銈",
    "錡", "鍈", "閒", "雞", "餃", "饀", "髙", "鯖",
    "鷗", "麴", "麵",
];

/// Text for a two-byte additional symbol code, `None` outside the
/// tabulated rows.
pub fn additional_symbol(code: u16) -> Option<&'static str> {
    let (start, table): (u16, &[&str]) = match code {
        0x7521..=0x757E => (0x7521, &ROW_75),
        0x7621..=0x764B => (0x7621, &ROW_76),
        0x7A50..=0x7A72 => (0x7A50, &ROW_7A),
        0x7C21..=0x7C7B => (0x7C21, &ROW_7C),
        0x7D21..=0x7D7B => (0x7D21, &ROW_7D),
        0x7E21..=0x7E7D => (0x7E21, &ROW_7E),
        _ => return None,
    };

    table.get((code - start) as usize).copied()
}

#[test]
fn lookup_symbols() {
    assert_eq!(additional_symbol(0x7A50), Some("[HV]"));
    assert_eq!(additional_symbol(0x7E21), Some("Ⅰ"));
    assert_eq!(additional_symbol(0x7A20), None);
}
